use async_trait::async_trait;
use futures::TryStreamExt;
use log::info;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};

use super::RecordStore;
use crate::structures::{errors::StoreError, model::StatusRecord};

const CREATE_TABLE: &str =
    "CREATE TABLE IF NOT EXISTS statuses (site_name TEXT NOT NULL, status TEXT NOT NULL)";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens the pool, checks the server answers and makes sure the
    /// `statuses` table exists.
    pub async fn connect(
        options: PgConnectOptions,
        max_connections: u32,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        let store = Self::new(pool);
        store.ping().await?;
        store.ensure_table().await?;
        Ok(store)
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        info!("Database answered ping");
        Ok(())
    }

    pub async fn ensure_table(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn append(&self, site_name: &str, status: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO statuses (site_name, status) VALUES ($1, $2)")
            .bind(site_name)
            .bind(status)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<StatusRecord>, StoreError> {
        Ok(
            sqlx::query_as::<_, StatusRecord>("SELECT site_name, status FROM statuses")
                .fetch(&self.pool)
                .try_collect::<Vec<_>>()
                .await?,
        )
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM statuses")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
