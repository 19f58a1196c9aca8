//! Core types and traits for fintrack storage backends.
//!
//! This crate provides the `StorageBackend` trait and the record types it
//! stores, enabling pluggable storage implementations in separate crates.

pub mod models;
pub mod storage;

// Re-export key types at crate root for convenience
pub use models::{Category, Expense, Salary};
pub use models::write::{NewExpense, NewSalary, SalaryPatch};
pub use storage::{StorageBackend, StorageError};
