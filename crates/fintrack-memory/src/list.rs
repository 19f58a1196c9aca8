use std::sync::{
    atomic::{AtomicI64, Ordering},
    RwLock,
};

use fintrack_core::{
    Expense, NewExpense, NewSalary, Salary, SalaryPatch, StorageBackend, StorageError,
};

use crate::{creation_time, poisoned};

#[derive(Default)]
struct Tables {
    salaries: Vec<Salary>,
    expenses: Vec<Expense>,
}

/// Volatile backend keeping each collection as a plain list in insertion order.
pub struct ListStorage {
    tables: RwLock<Tables>,
    salary_ids: AtomicI64,
    expense_ids: AtomicI64,
}

impl Default for ListStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl ListStorage {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            salary_ids: AtomicI64::new(1),
            expense_ids: AtomicI64::new(1),
        }
    }
}

impl StorageBackend for ListStorage {
    fn list_salaries(&self) -> Result<Vec<Salary>, StorageError> {
        let tables = self.tables.read().map_err(poisoned)?;
        let mut salaries = tables.salaries.clone();
        salaries.sort_by_key(|s| (s.created_at, s.id));
        Ok(salaries)
    }

    fn create_salary(&self, salary: &NewSalary) -> Result<Salary, StorageError> {
        // id, timestamp and push happen under one write guard
        let mut tables = self.tables.write().map_err(poisoned)?;
        let record = Salary {
            id: self.salary_ids.fetch_add(1, Ordering::SeqCst),
            amount: salary.amount,
            month: salary.month,
            year: salary.year,
            created_at: creation_time(tables.salaries.last().map(|s| s.created_at)),
        };
        tables.salaries.push(record.clone());
        tracing::debug!(id = record.id, month = record.month, year = record.year, "Salary created");
        Ok(record)
    }

    fn update_salary(&self, id: i64, patch: &SalaryPatch) -> Result<Salary, StorageError> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        let salary = tables.salaries.iter_mut()
            .find(|s| s.id == id)
            .ok_or(StorageError::SalaryNotFound(id))?;
        salary.apply(patch);
        tracing::debug!(id, "Salary updated");
        Ok(salary.clone())
    }

    fn list_expenses(&self) -> Result<Vec<Expense>, StorageError> {
        let tables = self.tables.read().map_err(poisoned)?;
        let mut expenses = tables.expenses.clone();
        expenses.sort_by_key(|e| (e.created_at, e.id));
        Ok(expenses)
    }

    fn create_expense(&self, expense: &NewExpense) -> Result<Expense, StorageError> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        let record = Expense {
            id: self.expense_ids.fetch_add(1, Ordering::SeqCst),
            amount: expense.amount,
            category: expense.category.clone(),
            month: expense.month,
            year: expense.year,
            created_at: creation_time(tables.expenses.last().map(|e| e.created_at)),
        };
        tables.expenses.push(record.clone());
        tracing::debug!(id = record.id, category = %record.category, "Expense created");
        Ok(record)
    }
}
