use crate::analytics::emitter::DataPoint;
use crate::health::models::LinkHealthStatus;
use crate::models::{Link, NewLink};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("slug already exists on this domain")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Link persistence, including the health fields written by the health
/// worker and the click events written by the analytics sink.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables and indexes)
    async fn init(&self) -> Result<()>;

    async fn create_link(&self, link: &NewLink) -> StorageResult<Link>;

    /// Look up a link by the domain it is served on and its slug
    async fn get_link(&self, domain: &str, slug: &str) -> Result<Option<Link>>;

    async fn get_link_by_id(&self, id: &str) -> Result<Option<Link>>;

    /// Archive a link (soft delete). Archived links are never health checked.
    async fn archive_link(&self, id: &str) -> Result<bool>;

    /// Non-archived links due for a probe at `now`, at most `limit`:
    /// never checked, healthy and older than 24h, broken or degraded and
    /// older than 6h, unknown and older than 12h. Never-checked links first.
    async fn find_due_for_health_check(&self, now: DateTime<Utc>, limit: i64)
        -> Result<Vec<Link>>;

    /// Persist a probe result onto the link's health fields
    async fn update_health(&self, link_id: &str, health: &LinkHealthStatus) -> Result<()>;

    /// Append analytics rows
    async fn insert_click_events(&self, points: &[DataPoint]) -> Result<()>;

    async fn count_click_events(&self, link_id: &str) -> Result<i64>;
}
