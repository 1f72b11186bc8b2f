//! Analytics sinks
//!
//! A sink accepts data points on the request path and owns their durability.
//! [`BufferedSink`] uses an actor fed by a bounded channel so the hot path
//! never waits on storage: the actor batches points locally and flushes them
//! on an interval and on shutdown. A full channel drops the point.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::analytics::emitter::DataPoint;
use crate::storage::Storage;

pub trait AnalyticsSink: Send + Sync {
    fn write_data_point(&self, point: DataPoint);
}

/// Why a point never reached the sink actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The channel is at capacity
    Full,
    /// The actor has already shut down
    Closed,
}

/// Message types for the sink actor
enum ActorMessage {
    Write(DataPoint),
    /// Flush everything and stop
    Shutdown,
}

struct SinkActor {
    receiver: mpsc::Receiver<ActorMessage>,
    buffer: Vec<DataPoint>,
    storage: Arc<dyn Storage>,
    flush_interval: Duration,
}

impl SinkActor {
    async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.flush_interval);

        // Skip the first tick which fires immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                msg = self.receiver.recv() => {
                    match msg {
                        Some(ActorMessage::Write(point)) => self.buffer.push(point),
                        Some(ActorMessage::Shutdown) => {
                            info!("Analytics sink received shutdown signal, flushing...");
                            self.flush().await;
                            break;
                        }
                        None => {
                            warn!("Analytics sink channel closed unexpectedly, flushing...");
                            self.flush().await;
                            break;
                        }
                    }
                }
                _ = ticker.tick() => {
                    self.flush().await;
                }
            }
        }
    }

    async fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        let batch = std::mem::take(&mut self.buffer);
        debug!(count = batch.len(), "Flushing analytics data points");

        if let Err(e) = self.storage.insert_click_events(&batch).await {
            error!(count = batch.len(), error = %e, "Failed to write analytics batch, dropping it");
        }
    }
}

pub struct BufferedSink {
    actor_tx: mpsc::Sender<ActorMessage>,
    actor_handle: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl BufferedSink {
    /// Spawn the actor. Must be called inside a tokio runtime.
    pub fn new(storage: Arc<dyn Storage>, buffer_size: usize, flush_interval_ms: u64) -> Self {
        let (actor_tx, actor_rx) = mpsc::channel(buffer_size.max(1));

        let actor = SinkActor {
            receiver: actor_rx,
            buffer: Vec::new(),
            storage,
            flush_interval: Duration::from_millis(flush_interval_ms.max(1)),
        };

        let handle = tokio::spawn(actor.run());

        Self {
            actor_tx,
            actor_handle: tokio::sync::Mutex::new(Some(handle)),
        }
    }

    /// Flush buffered points and wait for the actor to stop
    pub async fn shutdown(&self) {
        let _ = self.actor_tx.send(ActorMessage::Shutdown).await;
        if let Some(handle) = self.actor_handle.lock().await.take() {
            if let Err(e) = handle.await {
                error!(error = %e, "Analytics sink actor panicked");
            }
        }
    }

    /// Queue a point for the actor without waiting
    pub fn enqueue(&self, point: DataPoint) -> Result<(), DropReason> {
        self.actor_tx
            .try_send(ActorMessage::Write(point))
            .map_err(|e| match e {
                TrySendError::Full(_) => DropReason::Full,
                TrySendError::Closed(_) => DropReason::Closed,
            })
    }
}

impl AnalyticsSink for BufferedSink {
    fn write_data_point(&self, point: DataPoint) {
        match self.enqueue(point) {
            Ok(()) => {}
            Err(DropReason::Full) => warn!("Analytics sink buffer full, dropping data point"),
            Err(DropReason::Closed) => {
                warn!("Analytics sink already shut down, dropping data point")
            }
        }
    }
}

/// Logs each point at debug level and keeps nothing
#[derive(Debug, Default)]
pub struct LoggingSink;

impl AnalyticsSink for LoggingSink {
    fn write_data_point(&self, point: DataPoint) {
        debug!(link_id = point.link_id(), blobs = ?point.blobs, doubles = ?point.doubles, "analytics data point");
    }
}

/// Keeps points in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    points: Mutex<Vec<DataPoint>>,
}

impl MemorySink {
    pub fn points(&self) -> Vec<DataPoint> {
        self.points
            .lock()
            .map(|points| points.clone())
            .unwrap_or_default()
    }
}

impl AnalyticsSink for MemorySink {
    fn write_data_point(&self, point: DataPoint) {
        if let Ok(mut points) = self.points.lock() {
            points.push(point);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;

    fn point(link_id: &str) -> DataPoint {
        DataPoint {
            blobs: vec![link_id.to_string(); 20],
            doubles: vec![1_700_000_000_000.0, 0.0, 0.0, 0.0, 0.0, 1.0],
            indexes: vec![link_id.to_string()],
        }
    }

    async fn storage() -> Arc<dyn Storage> {
        let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
        storage.init().await.unwrap();
        Arc::new(storage)
    }

    #[tokio::test]
    async fn test_buffered_sink_flushes_on_shutdown() {
        let storage = storage().await;
        let sink = BufferedSink::new(Arc::clone(&storage), 16, 60_000);

        sink.write_data_point(point("lnk_a"));
        sink.write_data_point(point("lnk_a"));
        sink.write_data_point(point("lnk_b"));
        sink.shutdown().await;

        assert_eq!(storage.count_click_events("lnk_a").await.unwrap(), 2);
        assert_eq!(storage.count_click_events("lnk_b").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_buffered_sink_flushes_on_interval() {
        let storage = storage().await;
        let sink = BufferedSink::new(Arc::clone(&storage), 16, 20);

        sink.write_data_point(point("lnk_tick"));
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(storage.count_click_events("lnk_tick").await.unwrap(), 1);
        sink.shutdown().await;
    }

    #[tokio::test]
    async fn test_enqueue_reports_full_channel() {
        let storage = storage().await;
        let sink = BufferedSink::new(Arc::clone(&storage), 1, 60_000);

        // the actor has not been polled yet, so the single slot stays taken
        assert_eq!(sink.enqueue(point("lnk_full")), Ok(()));
        assert_eq!(sink.enqueue(point("lnk_full")), Err(DropReason::Full));
        sink.shutdown().await;
    }

    #[tokio::test]
    async fn test_enqueue_after_shutdown_reports_closed() {
        let storage = storage().await;
        let sink = BufferedSink::new(Arc::clone(&storage), 16, 60_000);
        sink.shutdown().await;

        assert_eq!(sink.enqueue(point("lnk_late")), Err(DropReason::Closed));
        sink.write_data_point(point("lnk_late"));
        assert_eq!(storage.count_click_events("lnk_late").await.unwrap(), 0);
    }

    #[test]
    fn test_memory_sink_collects() {
        let sink = MemorySink::default();
        sink.write_data_point(point("x"));
        assert_eq!(sink.points().len(), 1);
    }
}
