//! Destination probing
//!
//! One HEAD request per probe, redirects followed, cut off by a hard timeout.
//! The outcome is always a complete [`LinkHealthStatus`]; failures become a
//! status plus message instead of an error.

use chrono::Utc;
use std::error::Error as StdError;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

use crate::health::models::{HealthStatus, LinkHealthStatus};

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SLOW_THRESHOLD: Duration = Duration::from_millis(5_000);
const MAX_REDIRECTS: usize = 10;
const PROBE_USER_AGENT: &str = concat!("linkpulse-health-check/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Status for a received response
pub fn classify_response(
    status_code: u16,
    elapsed: Duration,
    slow_threshold: Duration,
) -> HealthStatus {
    match status_code {
        500.. => HealthStatus::Broken,
        400..=499 => HealthStatus::Broken,
        300..=399 => HealthStatus::Healthy,
        _ if elapsed > slow_threshold => HealthStatus::Degraded,
        _ => HealthStatus::Healthy,
    }
}

/// Status for a failed request, judged from its message only.
///
/// Timeouts and aborts may be transient and count as degraded; every other
/// failure is broken. This is a text heuristic and will misjudge some errors.
pub fn classify_failure(message: &str) -> HealthStatus {
    let lowered = message.to_lowercase();
    if ["timeout", "timed out", "abort"]
        .iter()
        .any(|needle| lowered.contains(needle))
    {
        HealthStatus::Degraded
    } else {
        HealthStatus::Broken
    }
}

/// Flatten an error and its sources into one line
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

fn is_https(url: &str) -> bool {
    url::Url::parse(url)
        .map(|u| u.scheme() == "https")
        .unwrap_or(false)
}

#[derive(Clone)]
pub struct LinkHealthProber {
    client: reqwest::Client,
    timeout: Duration,
    slow_threshold: Duration,
}

impl LinkHealthProber {
    pub fn new(timeout: Duration, slow_threshold: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(PROBE_USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            timeout,
            slow_threshold,
        })
    }

    pub fn with_defaults() -> Result<Self, ProbeError> {
        Self::new(DEFAULT_PROBE_TIMEOUT, DEFAULT_SLOW_THRESHOLD)
    }

    pub async fn probe(&self, url: &str) -> LinkHealthStatus {
        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.client.head(url).send()).await;
        let elapsed = started.elapsed();
        let response_time_ms = Some(elapsed.as_millis() as u64);

        let (status, status_code, error_message, succeeded) = match outcome {
            Ok(Ok(response)) => {
                let code = response.status().as_u16();
                let status = classify_response(code, elapsed, self.slow_threshold);
                debug!(url, code, elapsed_ms = elapsed.as_millis() as u64, %status, "probe completed");
                (status, Some(code), None, true)
            }
            Ok(Err(err)) => {
                // the destination url must not feed the keyword heuristic
                let err = err.without_url();
                let mut message = error_chain(&err);
                if err.is_timeout() && classify_failure(&message) != HealthStatus::Degraded {
                    message = format!("timeout: {message}");
                }
                let status = classify_failure(&message);
                warn!(url, error = %message, %status, "probe failed");
                (status, None, Some(message), false)
            }
            Err(_) => {
                let message = format!("request aborted after {} ms timeout", self.timeout.as_millis());
                warn!(url, error = %message, "probe timed out");
                (classify_failure(&message), None, Some(message), false)
            }
        };

        LinkHealthStatus {
            status,
            status_code,
            response_time_ms,
            error_message,
            last_checked_at: Utc::now(),
            ssl_valid: succeeded && is_https(url),
            ssl_expires_at: None,
        }
    }
}
