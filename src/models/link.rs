use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::analytics::metadata::ClickContext;
use crate::health::models::HealthStatus;

/// A short link as stored, including its latest health record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Link {
    pub id: String,
    pub slug: String,
    pub domain: String,
    pub destination_url: String,
    pub user_id: Option<String>,
    pub organization_id: Option<String>,
    pub archived: bool,
    pub ab_test_id: Option<String>,
    pub ab_variant: Option<String>,
    pub health_status: Option<String>,
    pub health_status_code: Option<i64>,
    pub health_response_time: Option<i64>,
    pub health_error_message: Option<String>,
    /// Unix seconds of the last probe, `None` if never probed
    pub last_health_check: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Link {
    pub fn status(&self) -> HealthStatus {
        HealthStatus::from_stored(self.health_status.as_deref())
    }

    pub fn last_checked_at(&self) -> Option<DateTime<Utc>> {
        self.last_health_check
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }

    pub fn click_context(&self) -> ClickContext {
        ClickContext {
            link_id: self.id.clone(),
            user_id: self.user_id.clone(),
            organization_id: self.organization_id.clone(),
            domain: self.domain.clone(),
            slug: self.slug.clone(),
            destination_url: self.destination_url.clone(),
            ab_test_id: self.ab_test_id.clone(),
            ab_variant: self.ab_variant.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewLink {
    pub slug: String,
    pub domain: String,
    pub destination_url: String,
    pub user_id: Option<String>,
    pub organization_id: Option<String>,
    pub ab_test_id: Option<String>,
    pub ab_variant: Option<String>,
}
