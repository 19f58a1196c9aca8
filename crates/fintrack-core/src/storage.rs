use crate::models::{
    write::{NewExpense, NewSalary, SalaryPatch},
    Expense, Salary,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{0}")]
    Other(String),
    #[error("salary not found: {0}")]
    SalaryNotFound(i64),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::SalaryNotFound(_))
    }
}

/// Record keeping for salaries and expenses.
///
/// Lists are ordered by `created_at` ascending, ties broken by `id`. Ids and
/// creation timestamps are assigned by the backend, never by the caller.
pub trait StorageBackend: Send + Sync {
    fn list_salaries(&self) -> Result<Vec<Salary>, StorageError>;
    fn create_salary(&self, salary: &NewSalary) -> Result<Salary, StorageError>;
    fn update_salary(&self, id: i64, patch: &SalaryPatch) -> Result<Salary, StorageError>;

    fn list_expenses(&self) -> Result<Vec<Expense>, StorageError>;
    fn create_expense(&self, expense: &NewExpense) -> Result<Expense, StorageError>;
}
