use crate::analytics::emitter::DataPoint;
use crate::analytics::metadata::generate_id;
use crate::health::models::LinkHealthStatus;
use crate::models::{Link, NewLink};
use crate::storage::{recheck_cutoffs, Storage, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

const LINK_COLUMNS: &str = "id, slug, domain, destination_url, user_id, organization_id, archived, \
     ab_test_id, ab_variant, health_status, health_status_code, health_response_time, \
     health_error_message, last_health_check, created_at, updated_at";

pub struct PostgresStorage {
    pool: Arc<PgPool>,
}

impl PostgresStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl Storage for PostgresStorage {
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
                archived BOOLEAN NOT NULL DEFAULT FALSE,
                ab_test_id TEXT,
                ab_variant TEXT,
                health_status TEXT,
                health_status_code BIGINT,
                health_response_time BIGINT,
                health_error_message TEXT,
                last_health_check BIGINT,
                created_at BIGINT NOT NULL,
                updated_at BIGINT NOT NULL,
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
                id BIGSERIAL PRIMARY KEY,
                link_id TEXT NOT NULL,
                timestamp_ms BIGINT NOT NULL,
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

        let row = sqlx::query_as::<_, Link>(&format!(
            r#"
            INSERT INTO links (id, slug, domain, destination_url, user_id, organization_id,
                               ab_test_id, ab_variant, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            ON CONFLICT (domain, slug) DO NOTHING
            RETURNING {LINK_COLUMNS}
            "#
        ))
        .bind(generate_id())
        .bind(&link.slug)
        .bind(&link.domain)
        .bind(&link.destination_url)
        .bind(&link.user_id)
        .bind(&link.organization_id)
        .bind(&link.ab_test_id)
        .bind(&link.ab_variant)
        .bind(now)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        row.ok_or(StorageError::Conflict)
    }

    async fn get_link(&self, domain: &str, slug: &str) -> Result<Option<Link>> {
        let link = sqlx::query_as::<_, Link>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE domain = $1 AND slug = $2"
        ))
        .bind(domain)
        .bind(slug)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn get_link_by_id(&self, id: &str) -> Result<Option<Link>> {
        let link =
            sqlx::query_as::<_, Link>(&format!("SELECT {LINK_COLUMNS} FROM links WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool.as_ref())
                .await?;

        Ok(link)
    }

    async fn archive_link(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE links SET archived = TRUE, updated_at = $1 WHERE id = $2")
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
            WHERE NOT archived
              AND (
                last_health_check IS NULL
                OR (health_status = 'healthy' AND last_health_check < $1)
                OR (health_status IN ('broken', 'degraded') AND last_health_check < $2)
                OR (COALESCE(health_status, 'unknown') NOT IN ('healthy', 'broken', 'degraded')
                    AND last_health_check < $3)
              )
            ORDER BY last_health_check ASC NULLS FIRST
            LIMIT $4
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
            SET health_status = $1,
                health_status_code = $2,
                health_response_time = $3,
                health_error_message = $4,
                last_health_check = $5,
                updated_at = $6
            WHERE id = $7
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
                "INSERT INTO click_events (link_id, timestamp_ms, blobs, doubles) VALUES ($1, $2, $3, $4)",
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
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM click_events WHERE link_id = $1")
            .bind(link_id)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count.0)
    }
}
