//! fintrack: monthly salary and expense tracking behind a small JSON API.
//!
//! Record types and the storage trait live in `fintrack-core`; the backends
//! live in their own crates. This crate validates requests, aggregates
//! records and serves them over HTTP.

pub mod api;
pub mod config;
pub mod error;
pub mod storage;
pub mod summary;
pub mod validation;
