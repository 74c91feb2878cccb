//! Detection loop.
//!
//! Pulls events from a [`Detector`] and hands each one to the
//! [`DetectionAdapter`] until the detector is exhausted or shutdown is
//! signalled.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Notify;
use vigil_core::{DomainEvent, Timestamp};

use crate::adapter::DetectionAdapter;
use crate::detector::Detector;
use crate::error::DetectError;

/// Counters for one monitor run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorStats {
    /// Events pulled from the detector.
    pub received: u64,
    /// Events stored as occurrences and offered for display.
    pub accepted: u64,
    /// Malformed events dropped before storage.
    pub rejected: u64,
}

/// Background loop driving a detector into the adapter.
pub struct DetectionMonitor {
    adapter: Arc<DetectionAdapter>,
    shutdown: Arc<Notify>,
    events: Option<UnboundedSender<DomainEvent>>,
}

impl DetectionMonitor {
    pub fn new(adapter: Arc<DetectionAdapter>) -> Self {
        Self {
            adapter,
            shutdown: Arc::new(Notify::new()),
            events: None,
        }
    }

    /// Publish monitor lifecycle events on `tx`.
    pub fn with_events(mut self, tx: UnboundedSender<DomainEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Run until `detector` is exhausted or [`shutdown`](Self::shutdown) is called.
    ///
    /// A shutdown signalled before `run` starts is remembered, so the loop
    /// returns without pulling anything.
    pub async fn run<D: Detector + ?Sized>(&self, detector: &mut D) -> MonitorStats {
        let mut stats = MonitorStats::default();
        tracing::info!(detector = detector.name(), "Detection monitor started");
        self.publish(DomainEvent::MonitorStarted {
            timestamp: Timestamp::now(),
        });

        loop {
            let next = tokio::select! {
                biased;
                _ = self.shutdown.notified() => {
                    tracing::info!("Detection monitor received shutdown signal");
                    break;
                }
                next = detector.next_detection() => next,
            };

            let Some(event) = next else {
                tracing::info!(detector = detector.name(), "Detector exhausted");
                break;
            };
            stats.received += 1;

            match self.adapter.handle(event) {
                Ok(occurrence) => {
                    stats.accepted += 1;
                    tracing::debug!(occurrence_id = %occurrence.id(), "Detection processed");
                }
                Err(e) if e.is_rejection() => {
                    stats.rejected += 1;
                }
                Err(DetectError::Alert(e)) => {
                    // Refused before storage; later events would be refused too.
                    tracing::warn!(error = %e, "Notifications unavailable; stopping monitor");
                    break;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to store detection");
                }
            }
        }

        tracing::info!(
            received = stats.received,
            accepted = stats.accepted,
            rejected = stats.rejected,
            "Detection monitor stopped"
        );
        self.publish(DomainEvent::MonitorStopped {
            events_processed: stats.received,
            timestamp: Timestamp::now(),
        });
        stats
    }

    /// Signal the monitor to stop after the current event.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(tx) = &self.events {
            if tx.send(event).is_err() {
                tracing::debug!("Event receiver dropped; monitor event discarded");
            }
        }
    }
}
