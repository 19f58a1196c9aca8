//! In-memory storage backends for fintrack. Nothing survives a restart.

mod indexed;
mod list;

use std::sync::PoisonError;

use fintrack_core::StorageError;
use time::OffsetDateTime;

pub use indexed::IndexedStorage;
pub use list::ListStorage;

/// Creation timestamp for a new record, never earlier than the previous one
/// so that `created_at` order matches id order even if the wall clock steps back.
fn creation_time(previous: Option<OffsetDateTime>) -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    match previous {
        Some(previous) if previous > now => previous,
        _ => now,
    }
}

fn poisoned<T>(_: PoisonError<T>) -> StorageError {
    StorageError::Other("storage lock poisoned".to_string())
}
