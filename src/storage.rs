use std::sync::Arc;

use fintrack_memory::{IndexedStorage, ListStorage};
use fintrack_postgres::PostgresStorage;
use fintrack_sqlite::SqliteStorage;

use crate::config::{BackendKind, StorageConfig};

// Re-export core storage types so callers can depend on crate::storage alone
pub use fintrack_core::storage::{StorageBackend, StorageError};

/// Builds the configured backend. Durable backends block while connecting,
/// so call this from a blocking context when inside the runtime.
pub fn open(config: &StorageConfig) -> Result<Arc<dyn StorageBackend>, StorageError> {
    let storage: Arc<dyn StorageBackend> = match config.backend {
        BackendKind::List => Arc::new(ListStorage::new()),
        BackendKind::Indexed => Arc::new(IndexedStorage::new()),
        BackendKind::Sqlite => Arc::new(SqliteStorage::new(&config.path)?),
        BackendKind::Postgres => {
            let url = config.url.as_deref().ok_or_else(|| {
                StorageError::Other("storage.url is required for the postgres backend".to_string())
            })?;
            Arc::new(PostgresStorage::new(url)?)
        }
    };
    Ok(storage)
}

/// Drops the last handle to `storage` on a blocking thread. The postgres
/// client shuts its own runtime down on drop and panics inside an async one.
pub async fn close(storage: Arc<dyn StorageBackend>) {
    if let Err(e) = tokio::task::spawn_blocking(move || drop(storage)).await {
        tracing::error!(error = %e, "Failed to release storage");
    }
}
