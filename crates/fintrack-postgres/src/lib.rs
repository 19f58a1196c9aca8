//! PostgreSQL storage backend for fintrack.
//!
//! Uses the blocking `postgres` client; callers running inside an async
//! runtime must invoke it from a blocking context.

use std::sync::{Mutex, MutexGuard};

use fintrack_core::{
    Expense, NewExpense, NewSalary, Salary, SalaryPatch, StorageBackend, StorageError,
};
use postgres::{Client, NoTls, Row};

const SALARY_COLUMNS: &str = "id, amount, month, year, created_at";
const EXPENSE_COLUMNS: &str = "id, amount, category, month, year, created_at";

pub struct PostgresStorage {
    client: Mutex<Client>,
}

impl PostgresStorage {
    pub fn new(connection_string: &str) -> Result<Self, StorageError> {
        let client = Client::connect(connection_string, NoTls)
            .map_err(|e| StorageError::Other(format!("PostgreSQL connection failed: {}", e)))?;

        let storage = Self {
            client: Mutex::new(client),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        let mut client = self.client()?;
        client
            .batch_execute(
                "
            CREATE TABLE IF NOT EXISTS salaries (
                id BIGSERIAL PRIMARY KEY,
                amount BIGINT NOT NULL,
                month BIGINT NOT NULL,
                year BIGINT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            );

            CREATE TABLE IF NOT EXISTS expenses (
                id BIGSERIAL PRIMARY KEY,
                amount BIGINT NOT NULL,
                category TEXT NOT NULL,
                month BIGINT NOT NULL,
                year BIGINT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            );

            CREATE INDEX IF NOT EXISTS idx_pg_salaries_created
                ON salaries(created_at, id);

            CREATE INDEX IF NOT EXISTS idx_pg_expenses_created
                ON expenses(created_at, id);
            ",
            )
            .map_err(backend_error)?;
        Ok(())
    }

    fn client(&self) -> Result<MutexGuard<'_, Client>, StorageError> {
        self.client.lock()
            .map_err(|_| StorageError::Other("PostgreSQL client lock poisoned".to_string()))
    }
}

fn backend_error(e: postgres::Error) -> StorageError {
    StorageError::Other(e.to_string())
}

fn salary_from_row(row: &Row) -> Result<Salary, StorageError> {
    Ok(Salary {
        id: row.try_get(0).map_err(backend_error)?,
        amount: row.try_get(1).map_err(backend_error)?,
        month: row.try_get(2).map_err(backend_error)?,
        year: row.try_get(3).map_err(backend_error)?,
        created_at: row.try_get(4).map_err(backend_error)?,
    })
}

fn expense_from_row(row: &Row) -> Result<Expense, StorageError> {
    Ok(Expense {
        id: row.try_get(0).map_err(backend_error)?,
        amount: row.try_get(1).map_err(backend_error)?,
        category: row.try_get(2).map_err(backend_error)?,
        month: row.try_get(3).map_err(backend_error)?,
        year: row.try_get(4).map_err(backend_error)?,
        created_at: row.try_get(5).map_err(backend_error)?,
    })
}

impl StorageBackend for PostgresStorage {
    fn list_salaries(&self) -> Result<Vec<Salary>, StorageError> {
        let mut client = self.client()?;
        let rows = client
            .query(&format!("SELECT {SALARY_COLUMNS} FROM salaries ORDER BY created_at, id"), &[])
            .map_err(backend_error)?;
        rows.iter().map(salary_from_row).collect()
    }

    fn create_salary(&self, salary: &NewSalary) -> Result<Salary, StorageError> {
        let mut client = self.client()?;
        let row = client
            .query_one(
                &format!("INSERT INTO salaries (amount, month, year) VALUES ($1, $2, $3) RETURNING {SALARY_COLUMNS}"),
                &[&salary.amount, &salary.month, &salary.year],
            )
            .map_err(backend_error)?;
        let record = salary_from_row(&row)?;
        tracing::debug!(id = record.id, month = record.month, year = record.year, "PostgreSQL salary created");
        Ok(record)
    }

    fn update_salary(&self, id: i64, patch: &SalaryPatch) -> Result<Salary, StorageError> {
        let mut client = self.client()?;
        let row = client
            .query_opt(
                &format!(
                    "UPDATE salaries SET
                        amount = COALESCE($2, amount),
                        month = COALESCE($3, month),
                        year = COALESCE($4, year)
                    WHERE id = $1
                    RETURNING {SALARY_COLUMNS}"
                ),
                &[&id, &patch.amount, &patch.month, &patch.year],
            )
            .map_err(backend_error)?
            .ok_or(StorageError::SalaryNotFound(id))?;
        tracing::debug!(id, "PostgreSQL salary updated");
        salary_from_row(&row)
    }

    fn list_expenses(&self) -> Result<Vec<Expense>, StorageError> {
        let mut client = self.client()?;
        let rows = client
            .query(&format!("SELECT {EXPENSE_COLUMNS} FROM expenses ORDER BY created_at, id"), &[])
            .map_err(backend_error)?;
        rows.iter().map(expense_from_row).collect()
    }

    fn create_expense(&self, expense: &NewExpense) -> Result<Expense, StorageError> {
        let mut client = self.client()?;
        let row = client
            .query_one(
                &format!("INSERT INTO expenses (amount, category, month, year) VALUES ($1, $2, $3, $4) RETURNING {EXPENSE_COLUMNS}"),
                &[&expense.amount, &expense.category, &expense.month, &expense.year],
            )
            .map_err(backend_error)?;
        let record = expense_from_row(&row)?;
        tracing::debug!(id = record.id, category = %record.category, "PostgreSQL expense created");
        Ok(record)
    }
}
