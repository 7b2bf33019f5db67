use async_trait::async_trait;

use crate::db::connection::DbPool;
use crate::db::repositories;

/// Read side used by the stream adapter on every (re)connect.
#[async_trait]
pub trait TermSource: Send + Sync {
    async fn list_current_options(&self) -> Result<Vec<String>, sqlx::Error>;
}

/// Write side used by the aggregator's flush.
#[async_trait]
pub trait TallyStore: Send + Sync {
    /// Atomically add `delta` to the stored count of `option` on every record
    /// that lists it.
    async fn increment_count(&self, option: &str, delta: i64) -> Result<(), sqlx::Error>;
}

/// PostgreSQL-backed implementation of both store seams.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl TermSource for PgStore {
    async fn list_current_options(&self) -> Result<Vec<String>, sqlx::Error> {
        repositories::list_current_options(&self.pool).await
    }
}

#[async_trait]
impl TallyStore for PgStore {
    async fn increment_count(&self, option: &str, delta: i64) -> Result<(), sqlx::Error> {
        let touched = repositories::increment_results(&self.pool, option, delta).await?;
        if touched == 0 {
            debug!(option, "no poll lists this option; increment dropped");
        }
        Ok(())
    }
}
