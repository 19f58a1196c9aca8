use std::{collections::BTreeMap, fmt::Display};

use fintrack_core::{Category, Expense, Salary};
use prettytable::{row, Table};
use serde::Serialize;
use time::Month;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Totals {
    pub income: i64,
    pub expenses: i64,
    pub net: i64,
}

impl Totals {
    pub fn compute(salaries: &[Salary], expenses: &[Expense]) -> Self {
        let income = sum(salaries.iter().map(|s| s.amount));
        let spent = sum(expenses.iter().map(|e| e.amount));
        Totals {
            income,
            expenses: spent,
            net: income.saturating_sub(spent),
        }
    }
}

fn sum(amounts: impl Iterator<Item = i64>) -> i64 {
    amounts.fold(0, i64::saturating_add)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthlyTotals {
    pub month: i64,
    pub income: i64,
    pub expenses: i64,
}

/// Twelve rows, January first. Entries whose month is outside 1-12 are not counted.
pub fn monthly_overview(salaries: &[Salary], expenses: &[Expense]) -> Vec<MonthlyTotals> {
    (1..=12)
        .map(|month| MonthlyTotals {
            month,
            income: sum(salaries.iter().filter(|s| s.month == month).map(|s| s.amount)),
            expenses: sum(expenses.iter().filter(|e| e.month == month).map(|e| e.amount)),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: i64,
    /// Whether the category is one of the ones offered to users.
    pub listed: bool,
}

/// Expense amount per category, in the order each category first appears.
pub fn category_breakdown(expenses: &[Expense]) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = Vec::new();
    for expense in expenses {
        match totals.iter_mut().find(|t| t.category == expense.category) {
            Some(total) => total.amount = total.amount.saturating_add(expense.amount),
            None => totals.push(CategoryTotal {
                category: expense.category.clone(),
                amount: expense.amount,
                listed: Category::parse(&expense.category).is_some(),
            }),
        }
    }
    totals
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DuplicatePeriod {
    pub month: i64,
    pub year: i64,
    pub count: usize,
}

/// Periods holding more than one salary entry, oldest first.
pub fn duplicate_periods(salaries: &[Salary]) -> Vec<DuplicatePeriod> {
    let mut counts: BTreeMap<(i64, i64), usize> = BTreeMap::new();
    for salary in salaries {
        *counts.entry((salary.year, salary.month)).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|((year, month), count)| DuplicatePeriod { month, year, count })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub year: Option<i64>,
    pub totals: Totals,
    pub monthly: Vec<MonthlyTotals>,
    pub categories: Vec<CategoryTotal>,
    pub duplicate_salary_periods: Vec<DuplicatePeriod>,
}

impl Summary {
    /// Aggregates every record, or only those of `year` when given.
    pub fn build(salaries: &[Salary], expenses: &[Expense], year: Option<i64>) -> Self {
        let salaries: Vec<Salary> = salaries.iter()
            .filter(|s| year.map_or(true, |y| s.year == y))
            .cloned()
            .collect();
        let expenses: Vec<Expense> = expenses.iter()
            .filter(|e| year.map_or(true, |y| e.year == y))
            .cloned()
            .collect();

        Summary {
            year,
            totals: Totals::compute(&salaries, &expenses),
            monthly: monthly_overview(&salaries, &expenses),
            categories: category_breakdown(&expenses),
            duplicate_salary_periods: duplicate_periods(&salaries),
        }
    }
}

fn month_name(month: i64) -> String {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| m.to_string())
        .unwrap_or_else(|| month.to_string())
}

impl Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut totals = Table::new();
        totals.add_row(row!["Total Income", "Total Expenses", "Net Savings"]);
        totals.add_row(row![
            format!("{} PLN", self.totals.income),
            format!("{} PLN", self.totals.expenses),
            format!("{} PLN", self.totals.net)
        ]);

        let mut monthly = Table::new();
        monthly.add_row(row!["Month", "Income", "Expenses"]);
        monthly.add_empty_row();
        for m in &self.monthly {
            monthly.add_row(row![month_name(m.month), m.income, m.expenses]);
        }

        let mut categories = Table::new();
        categories.add_row(row!["Category", "Amount"]);
        categories.add_empty_row();
        for c in &self.categories {
            let name = if c.listed { c.category.clone() } else { format!("{} *", c.category) };
            categories.add_row(row![name, c.amount]);
        }

        match self.year {
            Some(year) => writeln!(f, "Summary for {}", year)?,
            None => writeln!(f, "Summary for all years")?,
        }
        write!(f, "\n{}\n{}\n{}", totals, monthly, categories)?;
        if self.categories.iter().any(|c| !c.listed) {
            writeln!(f, "* not one of the standard categories")?;
        }
        for d in &self.duplicate_salary_periods {
            writeln!(f, "note: {} salary entries for {} {}", d.count, month_name(d.month), d.year)?;
        }
        Ok(())
    }
}
