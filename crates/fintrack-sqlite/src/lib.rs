//! SQLite storage backend for fintrack.
//!
//! Ids come from `AUTOINCREMENT` (never reused, even across restarts) and
//! `created_at` from a column default, so the database alone assigns both.

use std::sync::{Mutex, MutexGuard};

use fintrack_core::{
    Expense, NewExpense, NewSalary, Salary, SalaryPatch, StorageBackend, StorageError,
};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

const SALARY_COLUMNS: &str = "id, amount, month, year, created_at";
const EXPENSE_COLUMNS: &str = "id, amount, category, month, year, created_at";

pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(path)
        }
        .map_err(backend_error)?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(backend_error)?;

        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        tracing::debug!(path, "SQLite storage opened");
        Ok(storage)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.connection()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS salaries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                amount INTEGER NOT NULL,
                month INTEGER NOT NULL,
                year INTEGER NOT NULL,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE IF NOT EXISTS expenses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                amount INTEGER NOT NULL,
                category TEXT NOT NULL,
                month INTEGER NOT NULL,
                year INTEGER NOT NULL,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX IF NOT EXISTS idx_salaries_created
                ON salaries(created_at, id);

            CREATE INDEX IF NOT EXISTS idx_expenses_created
                ON expenses(created_at, id);
            ",
        )
        .map_err(backend_error)?;
        Ok(())
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock()
            .map_err(|_| StorageError::Other("SQLite connection lock poisoned".to_string()))
    }
}

fn backend_error(e: rusqlite::Error) -> StorageError {
    StorageError::Other(e.to_string())
}

fn timestamp(row: &Row, idx: usize) -> rusqlite::Result<OffsetDateTime> {
    let text: String = row.get(idx)?;
    OffsetDateTime::parse(&text, &Rfc3339)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn salary_from_row(row: &Row) -> rusqlite::Result<Salary> {
    Ok(Salary {
        id: row.get(0)?,
        amount: row.get(1)?,
        month: row.get(2)?,
        year: row.get(3)?,
        created_at: timestamp(row, 4)?,
    })
}

fn expense_from_row(row: &Row) -> rusqlite::Result<Expense> {
    Ok(Expense {
        id: row.get(0)?,
        amount: row.get(1)?,
        category: row.get(2)?,
        month: row.get(3)?,
        year: row.get(4)?,
        created_at: timestamp(row, 5)?,
    })
}

impl StorageBackend for SqliteStorage {
    fn list_salaries(&self) -> Result<Vec<Salary>, StorageError> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {SALARY_COLUMNS} FROM salaries ORDER BY created_at, id"))
            .map_err(backend_error)?;
        let rows = stmt.query_map([], salary_from_row).map_err(backend_error)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(backend_error)
    }

    fn create_salary(&self, salary: &NewSalary) -> Result<Salary, StorageError> {
        let conn = self.connection()?;
        let record = conn
            .query_row(
                &format!("INSERT INTO salaries (amount, month, year) VALUES (?1, ?2, ?3) RETURNING {SALARY_COLUMNS}"),
                params![salary.amount, salary.month, salary.year],
                salary_from_row,
            )
            .map_err(backend_error)?;
        tracing::debug!(id = record.id, month = record.month, year = record.year, "SQLite salary created");
        Ok(record)
    }

    fn update_salary(&self, id: i64, patch: &SalaryPatch) -> Result<Salary, StorageError> {
        let conn = self.connection()?;
        let record = conn
            .query_row(
                &format!(
                    "UPDATE salaries SET
                        amount = COALESCE(?2, amount),
                        month = COALESCE(?3, month),
                        year = COALESCE(?4, year)
                    WHERE id = ?1
                    RETURNING {SALARY_COLUMNS}"
                ),
                params![id, patch.amount, patch.month, patch.year],
                salary_from_row,
            )
            .optional()
            .map_err(backend_error)?
            .ok_or(StorageError::SalaryNotFound(id))?;
        tracing::debug!(id, "SQLite salary updated");
        Ok(record)
    }

    fn list_expenses(&self) -> Result<Vec<Expense>, StorageError> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {EXPENSE_COLUMNS} FROM expenses ORDER BY created_at, id"))
            .map_err(backend_error)?;
        let rows = stmt.query_map([], expense_from_row).map_err(backend_error)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(backend_error)
    }

    fn create_expense(&self, expense: &NewExpense) -> Result<Expense, StorageError> {
        let conn = self.connection()?;
        let record = conn
            .query_row(
                &format!("INSERT INTO expenses (amount, category, month, year) VALUES (?1, ?2, ?3, ?4) RETURNING {EXPENSE_COLUMNS}"),
                params![expense.amount, expense.category, expense.month, expense.year],
                expense_from_row,
            )
            .map_err(backend_error)?;
        tracing::debug!(id = record.id, category = %record.category, "SQLite expense created");
        Ok(record)
    }
}
