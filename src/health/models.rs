use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Last observed reachability of a link's destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Broken,
    /// Never probed
    #[default]
    Unknown,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Broken => "broken",
            HealthStatus::Unknown => "unknown",
        }
    }

    /// Read a stored value; anything unrecognised is `Unknown`
    pub fn from_stored(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or(HealthStatus::Unknown)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "healthy" => Ok(HealthStatus::Healthy),
            "degraded" => Ok(HealthStatus::Degraded),
            "broken" => Ok(HealthStatus::Broken),
            "unknown" => Ok(HealthStatus::Unknown),
            other => Err(format!("unknown health status '{other}'")),
        }
    }
}

/// Result of one probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkHealthStatus {
    pub status: HealthStatus,
    pub status_code: Option<u16>,
    pub response_time_ms: Option<u64>,
    pub error_message: Option<String>,
    pub last_checked_at: DateTime<Utc>,
    /// True when an HTTPS probe got any response; the certificate itself is not inspected
    pub ssl_valid: bool,
    /// Not derivable from a probe; always `None`
    pub ssl_expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_through_storage_text() {
        for status in [
            HealthStatus::Healthy,
            HealthStatus::Degraded,
            HealthStatus::Broken,
            HealthStatus::Unknown,
        ] {
            assert_eq!(HealthStatus::from_stored(Some(status.as_str())), status);
        }
        assert_eq!(HealthStatus::from_stored(None), HealthStatus::Unknown);
        assert_eq!(HealthStatus::from_stored(Some("gone")), HealthStatus::Unknown);
    }
}
