mod error;
mod memory;
pub mod models;
pub mod repositories;

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::config::DatabaseConfig;

pub use error::DatabaseError;
pub use memory::MemoryStore;
pub use models::*;
pub use repositories::*;

/// Data-access handle. Built once at startup, cloned into request state and
/// closed on shutdown.
#[derive(Clone)]
pub enum Database {
    Postgres(PgPool),
    Memory(Arc<MemoryStore>),
}

impl Database {
    /// Open the store named by `config.url`. `memory://` selects the
    /// in-process store; anything else is treated as a Postgres URL and
    /// migrated on connect.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        if config.is_memory() {
            info!("Using in-memory document store");
            return Ok(Self::in_memory());
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections.unwrap_or(10))
            .min_connections(config.min_connections.unwrap_or(1))
            .connect(&config.url)
            .await
            .context("Failed to connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;

        info!("Database pool ready");
        Ok(Database::Postgres(pool))
    }

    pub fn in_memory() -> Self {
        Database::Memory(Arc::new(MemoryStore::default()))
    }

    pub async fn ping(&self) -> Result<(), DatabaseError> {
        match self {
            Database::Postgres(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
                Ok(())
            }
            Database::Memory(_) => Ok(()),
        }
    }

    pub async fn close(&self) {
        if let Database::Postgres(pool) = self {
            pool.close().await;
            info!("Database pool closed");
        }
    }
}
