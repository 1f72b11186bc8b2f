pub mod postgres;
pub mod sqlite;
pub mod trait_def;

pub use postgres::PostgresStorage;
pub use sqlite::SqliteStorage;
pub use trait_def::{Storage, StorageError, StorageResult};

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

use crate::config::{DatabaseBackend, DatabaseConfig};
use crate::health::models::HealthStatus;
use crate::health::scheduler::recheck_interval;

/// Unix-second thresholds below which a link's last probe is stale
pub(crate) struct RecheckCutoffs {
    pub healthy: i64,
    pub problem: i64,
    pub unknown: i64,
}

pub(crate) fn recheck_cutoffs(now: DateTime<Utc>) -> RecheckCutoffs {
    let cutoff = |status| (now - recheck_interval(status)).timestamp();
    RecheckCutoffs {
        healthy: cutoff(HealthStatus::Healthy),
        problem: cutoff(HealthStatus::Broken),
        unknown: cutoff(HealthStatus::Unknown),
    }
}

/// Open the configured backend. Tables are not created here; call
/// [`Storage::init`] afterwards.
pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match config.backend {
        DatabaseBackend::Sqlite => {
            info!("Using SQLite storage: {}", config.url);
            Arc::new(SqliteStorage::new(&config.url, config.max_connections).await?)
        }
        DatabaseBackend::Postgres => {
            info!("Using PostgreSQL storage: {}", config.url);
            Arc::new(PostgresStorage::new(&config.url, config.max_connections).await?)
        }
    };
    Ok(storage)
}
