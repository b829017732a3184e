use std::sync::Mutex;

use async_trait::async_trait;

use super::RecordStore;
use crate::structures::{errors::StoreError, model::StatusRecord};

/// In-process store keeping rows in insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<StatusRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self) -> std::sync::MutexGuard<'_, Vec<StatusRecord>> {
        // a panic while holding the lock cannot leave a half-written row
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn append(&self, site_name: &str, status: &str) -> Result<(), StoreError> {
        self.rows().push(StatusRecord::new(site_name, status));
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<StatusRecord>, StoreError> {
        Ok(self.rows().clone())
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        self.rows().clear();
        Ok(())
    }
}
