//! Destination health checks
//!
//! [`prober`] issues a single probe and classifies it, [`scheduler`] decides
//! which links are due and runs probes in bounded batches.

pub mod models;
pub mod prober;
pub mod scheduler;

pub use models::{HealthStatus, LinkHealthStatus};
pub use prober::{LinkHealthProber, ProbeError};
pub use scheduler::{is_due, HealthRunSummary, HealthScheduler, HealthWorker};
