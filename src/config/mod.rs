use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub redirect_server: ServerConfig,
    pub analytics: AnalyticsConfig,
    pub health: HealthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// How far the client IP headers can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustedProxyMode {
    /// Only `cf-connecting-ip` is honored
    Cloudflare,
    /// `Forwarded` then `X-Forwarded-For`
    Standard,
    /// Socket address only
    None,
}

/// Where click records go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsSinkKind {
    /// Buffered writes to the `click_events` table
    Storage,
    /// Debug log only, nothing persisted
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    pub sink: AnalyticsSinkKind,
    pub trusted_proxy_mode: TrustedProxyMode,
    /// Optional MaxMind City database used when edge geo headers are missing
    pub geoip_city_db_path: Option<String>,
    /// Edge region reported when the request carries no colo
    pub edge_region: Option<String>,
    pub buffer_size: usize,
    pub flush_interval_ms: u64,
    pub dedup_window_secs: u64,
    pub dedup_max_entries: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub batch_size: i64,
    pub concurrency: usize,
    pub timeout_ms: u64,
    pub slow_threshold_ms: u64,
}

impl HealthConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn slow_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_threshold_ms)
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 900,
            batch_size: 50,
            concurrency: 8,
            timeout_ms: 10_000,
            slow_threshold_ms: 5_000,
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            sink: AnalyticsSinkKind::Storage,
            trusted_proxy_mode: TrustedProxyMode::Cloudflare,
            geoip_city_db_path: None,
            edge_region: None,
            buffer_size: 10_000,
            flush_interval_ms: 1_000,
            dedup_window_secs: 86_400,
            dedup_max_entries: 1_000_000,
        }
    }
}

/// Read and parse a numeric variable, using `default` when it is unset.
fn env_parse<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{name} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str =
            std::env::var("DATABASE_BACKEND").unwrap_or_else(|_| "sqlite".to_string());

        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            "sqlite" => DatabaseBackend::Sqlite,
            other => {
                tracing::warn!(
                    "Unknown DATABASE_BACKEND '{other}', falling back to 'sqlite'. Supported values: sqlite, postgres"
                );
                DatabaseBackend::Sqlite
            }
        };

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./linkpulse.db".to_string());
        let max_connections = env_parse("DATABASE_MAX_CONNECTIONS", 10u32)?;

        let redirect_host =
            std::env::var("REDIRECT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let redirect_port = env_parse("REDIRECT_PORT", 3000u16)?;

        let trusted_proxy_mode = match std::env::var("TRUSTED_PROXY_MODE")
            .unwrap_or_else(|_| "cloudflare".to_string())
            .to_lowercase()
            .as_str()
        {
            "cloudflare" => TrustedProxyMode::Cloudflare,
            "standard" => TrustedProxyMode::Standard,
            "none" => TrustedProxyMode::None,
            other => {
                tracing::warn!(
                    "Unknown TRUSTED_PROXY_MODE '{other}', falling back to 'cloudflare'. Supported values: cloudflare, standard, none"
                );
                TrustedProxyMode::Cloudflare
            }
        };

        let sink = match std::env::var("ANALYTICS_SINK")
            .unwrap_or_else(|_| "storage".to_string())
            .to_lowercase()
            .as_str()
        {
            "storage" => AnalyticsSinkKind::Storage,
            "log" => AnalyticsSinkKind::Log,
            other => {
                tracing::warn!(
                    "Unknown ANALYTICS_SINK '{other}', falling back to 'storage'. Supported values: storage, log"
                );
                AnalyticsSinkKind::Storage
            }
        };

        let analytics_defaults = AnalyticsConfig::default();
        let analytics = AnalyticsConfig {
            sink,
            trusted_proxy_mode,
            geoip_city_db_path: std::env::var("GEOIP_CITY_DB_PATH").ok(),
            edge_region: std::env::var("EDGE_REGION").ok(),
            buffer_size: env_parse("ANALYTICS_BUFFER_SIZE", analytics_defaults.buffer_size)?,
            flush_interval_ms: env_parse(
                "ANALYTICS_FLUSH_INTERVAL_MS",
                analytics_defaults.flush_interval_ms,
            )?,
            dedup_window_secs: env_parse("DEDUP_WINDOW_SECS", analytics_defaults.dedup_window_secs)?,
            dedup_max_entries: env_parse("DEDUP_MAX_ENTRIES", analytics_defaults.dedup_max_entries)?,
        };

        let health_defaults = HealthConfig::default();
        let health = HealthConfig {
            enabled: env_flag("HEALTH_CHECK_ENABLED", health_defaults.enabled),
            interval_secs: env_parse("HEALTH_CHECK_INTERVAL_SECS", health_defaults.interval_secs)?,
            batch_size: env_parse("HEALTH_CHECK_BATCH_SIZE", health_defaults.batch_size)?,
            concurrency: env_parse("HEALTH_CHECK_CONCURRENCY", health_defaults.concurrency)?,
            timeout_ms: env_parse("HEALTH_CHECK_TIMEOUT_MS", health_defaults.timeout_ms)?,
            slow_threshold_ms: env_parse(
                "HEALTH_CHECK_SLOW_MS",
                health_defaults.slow_threshold_ms,
            )?,
        };

        Ok(Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
            },
            redirect_server: ServerConfig {
                host: redirect_host,
                port: redirect_port,
            },
            analytics,
            health,
        })
    }
}
