use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicI64, Ordering},
        RwLock,
    },
};

use fintrack_core::{
    Expense, NewExpense, NewSalary, Salary, SalaryPatch, StorageBackend, StorageError,
};

use crate::{creation_time, poisoned};

#[derive(Default)]
struct Tables {
    salaries: BTreeMap<i64, Salary>,
    expenses: BTreeMap<i64, Expense>,
}

/// Volatile backend keyed by id with auto-increment counters.
///
/// Ids are drawn while the write guard is held and `created_at` never goes
/// backwards, so iterating the maps in key order is already the
/// `(created_at, id)` order the trait promises.
pub struct IndexedStorage {
    tables: RwLock<Tables>,
    salary_ids: AtomicI64,
    expense_ids: AtomicI64,
}

impl Default for IndexedStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexedStorage {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            salary_ids: AtomicI64::new(1),
            expense_ids: AtomicI64::new(1),
        }
    }
}

impl StorageBackend for IndexedStorage {
    fn list_salaries(&self) -> Result<Vec<Salary>, StorageError> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables.salaries.values().cloned().collect())
    }

    fn create_salary(&self, salary: &NewSalary) -> Result<Salary, StorageError> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        let previous = tables.salaries.last_key_value().map(|(_, s)| s.created_at);
        let record = Salary {
            id: self.salary_ids.fetch_add(1, Ordering::SeqCst),
            amount: salary.amount,
            month: salary.month,
            year: salary.year,
            created_at: creation_time(previous),
        };
        tables.salaries.insert(record.id, record.clone());
        tracing::debug!(id = record.id, month = record.month, year = record.year, "Salary created");
        Ok(record)
    }

    fn update_salary(&self, id: i64, patch: &SalaryPatch) -> Result<Salary, StorageError> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        let salary = tables.salaries.get_mut(&id)
            .ok_or(StorageError::SalaryNotFound(id))?;
        salary.apply(patch);
        tracing::debug!(id, "Salary updated");
        Ok(salary.clone())
    }

    fn list_expenses(&self) -> Result<Vec<Expense>, StorageError> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables.expenses.values().cloned().collect())
    }

    fn create_expense(&self, expense: &NewExpense) -> Result<Expense, StorageError> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        let previous = tables.expenses.last_key_value().map(|(_, e)| e.created_at);
        let record = Expense {
            id: self.expense_ids.fetch_add(1, Ordering::SeqCst),
            amount: expense.amount,
            category: expense.category.clone(),
            month: expense.month,
            year: expense.year,
            created_at: creation_time(previous),
        };
        tables.expenses.insert(record.id, record.clone());
        tracing::debug!(id = record.id, category = %record.category, "Expense created");
        Ok(record)
    }
}
