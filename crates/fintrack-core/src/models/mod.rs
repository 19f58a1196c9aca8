use std::fmt::Display;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use self::write::SalaryPatch;

pub mod write;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Salary {
    pub id: i64,
    pub amount: i64,
    pub month: i64,
    pub year: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Salary {
    /// Applies the supplied fields of `patch`, leaving `id` and `created_at` untouched.
    pub fn apply(&mut self, patch: &SalaryPatch) {
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(month) = patch.month {
            self.month = month;
        }
        if let Some(year) = patch.year {
            self.year = year;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: i64,
    pub amount: i64,
    /// Free-form; see [`Category`] for the values the UI offers.
    pub category: String,
    pub month: i64,
    pub year: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The expense categories offered to users. Advisory only: nothing rejects an
/// expense whose category is not listed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Rent,
    SchoolFees,
    CityTransport,
    Vacation,
    Shopping,
    Food,
    Grocery,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Rent,
        Category::SchoolFees,
        Category::CityTransport,
        Category::Vacation,
        Category::Shopping,
        Category::Food,
        Category::Grocery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Rent => "Rent",
            Category::SchoolFees => "School Fees",
            Category::CityTransport => "City Transport",
            Category::Vacation => "Vacation",
            Category::Shopping => "Shopping",
            Category::Food => "Food",
            Category::Grocery => "Grocery",
        }
    }

    pub fn parse(s: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
