//! Health-check scheduling
//!
//! Re-check cadence depends on the last observed status, so problem links are
//! re-verified more often than healthy ones. A failed probe is not retried; it
//! is simply due again sooner. The scheduler does not run itself:
//! [`HealthWorker`] (or any other caller) invokes it on a timer.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::health::models::{HealthStatus, LinkHealthStatus};
use crate::health::prober::LinkHealthProber;
use crate::models::Link;
use crate::storage::Storage;

pub const HEALTHY_RECHECK_HOURS: i64 = 24;
pub const PROBLEM_RECHECK_HOURS: i64 = 6;
pub const UNKNOWN_RECHECK_HOURS: i64 = 12;

/// How long a link in `status` may go without a probe
pub fn recheck_interval(status: HealthStatus) -> ChronoDuration {
    match status {
        HealthStatus::Healthy => ChronoDuration::hours(HEALTHY_RECHECK_HOURS),
        HealthStatus::Broken | HealthStatus::Degraded => {
            ChronoDuration::hours(PROBLEM_RECHECK_HOURS)
        }
        HealthStatus::Unknown => ChronoDuration::hours(UNKNOWN_RECHECK_HOURS),
    }
}

/// Whether `link` should be probed at `now`.
///
/// Compared in whole unix seconds, the resolution probes are stored at, so
/// this agrees with [`Storage::find_due_for_health_check`].
pub fn is_due(link: &Link, now: DateTime<Utc>) -> bool {
    if link.archived {
        return false;
    }
    match link.last_health_check {
        None => true,
        Some(last) => last < (now - recheck_interval(link.status())).timestamp(),
    }
}

/// Summary of one scheduler pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HealthRunSummary {
    pub checked: usize,
    pub healthy: usize,
    pub degraded: usize,
    pub broken: usize,
    pub write_failures: usize,
}

impl HealthRunSummary {
    fn record(&mut self, status: HealthStatus) {
        self.checked += 1;
        match status {
            HealthStatus::Healthy => self.healthy += 1,
            HealthStatus::Degraded => self.degraded += 1,
            HealthStatus::Broken => self.broken += 1,
            HealthStatus::Unknown => {}
        }
    }
}

#[derive(Clone)]
pub struct HealthScheduler {
    storage: Arc<dyn Storage>,
    prober: LinkHealthProber,
    batch_size: i64,
    concurrency: usize,
}

impl HealthScheduler {
    pub fn new(
        storage: Arc<dyn Storage>,
        prober: LinkHealthProber,
        batch_size: i64,
        concurrency: usize,
    ) -> Self {
        Self {
            storage,
            prober,
            batch_size,
            concurrency: concurrency.max(1),
        }
    }

    /// Links due for a probe, bounded by the batch size
    pub async fn select_due(&self, now: DateTime<Utc>) -> anyhow::Result<Vec<Link>> {
        self.storage
            .find_due_for_health_check(now, self.batch_size)
            .await
    }

    /// Probe every due link and store the results.
    ///
    /// Probes of different links run concurrently and independently. Two
    /// overlapping passes may probe the same link; the last write wins.
    pub async fn run_once(&self, now: DateTime<Utc>) -> anyhow::Result<HealthRunSummary> {
        let due = self.select_due(now).await?;
        if due.is_empty() {
            debug!("No links due for a health check");
            return Ok(HealthRunSummary::default());
        }

        debug!(count = due.len(), "Probing links due for a health check");

        // each result is stored as soon as its own probe finishes
        let outcomes: Vec<(HealthStatus, bool)> = stream::iter(due)
            .map(|link| {
                let prober = self.prober.clone();
                let storage = Arc::clone(&self.storage);
                async move {
                    let health = prober.probe(&link.destination_url).await;
                    let stored = store_result(storage.as_ref(), &link, &health).await;
                    (health.status, stored)
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut summary = HealthRunSummary::default();
        for (status, stored) in outcomes {
            summary.record(status);
            if !stored {
                summary.write_failures += 1;
            }
        }

        info!(
            checked = summary.checked,
            healthy = summary.healthy,
            degraded = summary.degraded,
            broken = summary.broken,
            "Health check pass complete"
        );

        Ok(summary)
    }
}

async fn store_result(storage: &dyn Storage, link: &Link, health: &LinkHealthStatus) -> bool {
    match storage.update_health(&link.id, health).await {
        Ok(()) => true,
        Err(e) => {
            error!(link_id = %link.id, error = %e, "Failed to store health result");
            false
        }
    }
}

/// Runs [`HealthScheduler::run_once`] on a fixed interval until shut down
pub struct HealthWorker {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl HealthWorker {
    pub fn spawn(scheduler: HealthScheduler, interval: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = scheduler.run_once(Utc::now()).await {
                            warn!(error = %e, "Health check pass failed");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            info!("Health worker shutting down");
                            break;
                        }
                    }
                }
            }
        });

        Self {
            shutdown_tx,
            handle,
        }
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            error!(error = %e, "Health worker panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(status: Option<&str>, hours_ago: Option<i64>, now: DateTime<Utc>) -> Link {
        Link {
            id: "lnk".to_string(),
            slug: "abc".to_string(),
            domain: "go2.gg".to_string(),
            destination_url: "https://d.example".to_string(),
            user_id: None,
            organization_id: None,
            archived: false,
            ab_test_id: None,
            ab_variant: None,
            health_status: status.map(str::to_string),
            health_status_code: None,
            health_response_time: None,
            health_error_message: None,
            last_health_check: hours_ago.map(|h| (now - ChronoDuration::hours(h)).timestamp()),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_never_checked_is_due() {
        let now = Utc::now();
        assert!(is_due(&link(None, None, now), now));
        assert!(is_due(&link(Some("healthy"), None, now), now));
    }

    #[test]
    fn test_healthy_cadence() {
        let now = Utc::now();
        assert!(is_due(&link(Some("healthy"), Some(25), now), now));
        assert!(!is_due(&link(Some("healthy"), Some(10), now), now));
    }

    #[test]
    fn test_problem_cadence() {
        let now = Utc::now();
        assert!(is_due(&link(Some("broken"), Some(7), now), now));
        assert!(!is_due(&link(Some("broken"), Some(2), now), now));
        assert!(is_due(&link(Some("degraded"), Some(7), now), now));
        assert!(!is_due(&link(Some("degraded"), Some(5), now), now));
    }

    #[test]
    fn test_unknown_cadence() {
        let now = Utc::now();
        assert!(is_due(&link(Some("unknown"), Some(13), now), now));
        assert!(!is_due(&link(Some("unknown"), Some(11), now), now));
        assert!(is_due(&link(None, Some(13), now), now));
    }

    #[test]
    fn test_due_boundary_uses_whole_seconds() {
        let now = DateTime::from_timestamp(1_700_000_000, 500_000_000).unwrap();
        let cutoff = (now - ChronoDuration::hours(PROBLEM_RECHECK_HOURS)).timestamp();

        let mut at_cutoff = link(Some("broken"), None, now);
        at_cutoff.last_health_check = Some(cutoff);
        assert!(!is_due(&at_cutoff, now));

        at_cutoff.last_health_check = Some(cutoff - 1);
        assert!(is_due(&at_cutoff, now));
    }

    #[test]
    fn test_archived_never_due() {
        let now = Utc::now();
        let mut archived = link(None, None, now);
        archived.archived = true;
        assert!(!is_due(&archived, now));
    }
}
