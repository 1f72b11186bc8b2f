use crate::analytics::emitter::DataPoint;
use crate::analytics::metadata::generate_id;
use crate::health::models::LinkHealthStatus;
use crate::models::{Link, NewLink};
use crate::storage::{recheck_cutoffs, Storage, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;

const LINK_COLUMNS: &str = "id, slug, domain, destination_url, user_id, organization_id, archived, \
     ab_test_id, ab_variant, health_status, health_status_code, health_response_time, \
     health_error_message, last_health_check, created_at, updated_at";

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

impl SqliteStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS links (
                id TEXT PRIMARY KEY,
                slug TEXT NOT NULL,
                domain TEXT NOT NULL,
                destination_url TEXT NOT NULL,
                user_id TEXT,
                organization_id TEXT,
                archived INTEGER NOT NULL DEFAULT 0,
                ab_test_id TEXT,
                ab_variant TEXT,
                health_status TEXT,
                health_status_code INTEGER,
                health_response_time INTEGER,
                health_error_message TEXT,
                last_health_check INTEGER,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE (domain, slug)
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_links_health ON links(archived, last_health_check)",
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS click_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                link_id TEXT NOT NULL,
                timestamp_ms INTEGER NOT NULL,
                blobs TEXT NOT NULL,
                doubles TEXT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_click_events_link ON click_events(link_id)")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn create_link(&self, link: &NewLink) -> StorageResult<Link> {
        let now = Utc::now().timestamp();
        let id = generate_id();

        let result = sqlx::query(
            r#"
            INSERT INTO links (id, slug, domain, destination_url, user_id, organization_id,
                               ab_test_id, ab_variant, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(domain, slug) DO NOTHING
            "#,
        )
        .bind(&id)
        .bind(&link.slug)
        .bind(&link.domain)
        .bind(&link.destination_url)
        .bind(&link.user_id)
        .bind(&link.organization_id)
        .bind(&link.ab_test_id)
        .bind(&link.ab_variant)
        .bind(now)
        .bind(now)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }

        self.get_link_by_id(&id)
            .await?
            .ok_or_else(|| StorageError::Other(anyhow::anyhow!("link {id} vanished after insert")))
    }

    async fn get_link(&self, domain: &str, slug: &str) -> Result<Option<Link>> {
        let link = sqlx::query_as::<_, Link>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE domain = ? AND slug = ?"
        ))
        .bind(domain)
        .bind(slug)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn get_link_by_id(&self, id: &str) -> Result<Option<Link>> {
        let link = sqlx::query_as::<_, Link>(&format!("SELECT {LINK_COLUMNS} FROM links WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(link)
    }

    async fn archive_link(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE links SET archived = 1, updated_at = ? WHERE id = ?")
            .bind(Utc::now().timestamp())
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_due_for_health_check(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Link>> {
        let cutoffs = recheck_cutoffs(now);

        let links = sqlx::query_as::<_, Link>(&format!(
            r#"
            SELECT {LINK_COLUMNS}
            FROM links
            WHERE archived = 0
              AND (
                last_health_check IS NULL
                OR (health_status = 'healthy' AND last_health_check < ?)
                OR (health_status IN ('broken', 'degraded') AND last_health_check < ?)
                OR (COALESCE(health_status, 'unknown') NOT IN ('healthy', 'broken', 'degraded')
                    AND last_health_check < ?)
              )
            ORDER BY last_health_check IS NOT NULL, last_health_check ASC
            LIMIT ?
            "#
        ))
        .bind(cutoffs.healthy)
        .bind(cutoffs.problem)
        .bind(cutoffs.unknown)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(links)
    }

    async fn update_health(&self, link_id: &str, health: &LinkHealthStatus) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE links
            SET health_status = ?,
                health_status_code = ?,
                health_response_time = ?,
                health_error_message = ?,
                last_health_check = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(health.status.as_str())
        .bind(health.status_code.map(i64::from))
        .bind(health.response_time_ms.map(|ms| ms as i64))
        .bind(&health.error_message)
        .bind(health.last_checked_at.timestamp())
        .bind(Utc::now().timestamp())
        .bind(link_id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn insert_click_events(&self, points: &[DataPoint]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for point in points {
            sqlx::query(
                "INSERT INTO click_events (link_id, timestamp_ms, blobs, doubles) VALUES (?, ?, ?, ?)",
            )
            .bind(point.link_id())
            .bind(point.timestamp_ms())
            .bind(serde_json::to_string(&point.blobs)?)
            .bind(serde_json::to_string(&point.doubles)?)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(())
    }

    async fn count_click_events(&self, link_id: &str) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM click_events WHERE link_id = ?")
            .bind(link_id)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count.0)
    }
}
