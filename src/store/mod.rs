mod memory;
mod postgres;

use async_trait::async_trait;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::structures::{errors::StoreError, model::StatusRecord};

/// Append-only log of status observations plus a bulk clear.
///
/// Implementations are shared by every in-flight request and must tolerate
/// concurrent calls.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts one row. Empty strings and duplicates are stored as given.
    async fn append(&self, site_name: &str, status: &str) -> Result<(), StoreError>;

    /// Every row inserted since the last clear. No ordering is promised.
    async fn list_all(&self) -> Result<Vec<StatusRecord>, StoreError>;

    /// Deletes every row.
    async fn clear_all(&self) -> Result<(), StoreError>;
}
