//! Detection adapter: raw detection event in, stored occurrence out.
//!
//! Every valid event becomes exactly one occurrence. There is no filtering
//! or deduplication, and malformed durations are rejected rather than
//! clamped.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc::UnboundedSender;
use vigil_alert::NotificationScheduler;
use vigil_core::{DetectionEvent, DomainEvent, Occurrence, Timestamp};
use vigil_store::OccurrenceStore;

use crate::error::DetectError;

/// Check a raw duration and narrow it to the stored width.
pub fn validate_duration(duration_secs: i64) -> Result<u32, DetectError> {
    if duration_secs < 0 {
        return Err(DetectError::NegativeDuration(duration_secs));
    }
    u32::try_from(duration_secs).map_err(|_| DetectError::DurationOutOfRange(duration_secs))
}

/// Feeds detection events into the store and the notification slot.
pub struct DetectionAdapter {
    store: Arc<OccurrenceStore>,
    scheduler: Option<Arc<NotificationScheduler>>,
    events: Option<UnboundedSender<DomainEvent>>,
    // Serialises insert + offer so alert order always matches store order.
    gate: Mutex<()>,
}

impl DetectionAdapter {
    /// Adapter that stores occurrences without raising alerts.
    pub fn new(store: Arc<OccurrenceStore>) -> Self {
        Self {
            store,
            scheduler: None,
            events: None,
            gate: Mutex::new(()),
        }
    }

    /// Offer every accepted occurrence to `scheduler`.
    pub fn with_notifications(mut self, scheduler: Arc<NotificationScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Publish detection events on `tx`.
    pub fn with_events(mut self, tx: UnboundedSender<DomainEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Turn one detection event into a stored occurrence and show its alert.
    ///
    /// Either both happen or neither does. The notification slot is reserved
    /// before the insert, so a shut-down scheduler fails the call with
    /// [`DetectError::Alert`] and nothing is stored, and a failed insert
    /// releases the slot without showing anything.
    pub fn handle(&self, event: DetectionEvent) -> Result<Occurrence, DetectError> {
        let duration_secs = match validate_duration(event.duration_secs) {
            Ok(secs) => secs,
            Err(e) => {
                tracing::warn!(
                    category = event.category.code(),
                    duration_secs = event.duration_secs,
                    error = %e,
                    "Detection rejected"
                );
                self.publish(DomainEvent::DetectionRejected {
                    reason: e.to_string(),
                    timestamp: Timestamp::now(),
                });
                return Err(e);
            }
        };

        let occurrence = Occurrence::new(event.category, duration_secs, event.detected_at)
            .with_program(event.program_name, event.program_category);

        let _guard = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        let permit = match &self.scheduler {
            Some(scheduler) => Some(scheduler.reserve()?),
            None => None,
        };
        self.store.insert(occurrence.clone())?;
        self.publish(DomainEvent::OccurrenceDetected {
            occurrence_id: occurrence.id(),
            category: occurrence.category().clone(),
            severity: occurrence.severity(),
            duration_secs,
            timestamp: Timestamp::now(),
        });

        if let Some(permit) = permit {
            permit.show(occurrence.clone());
        }
        Ok(occurrence)
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(tx) = &self.events {
            if tx.send(event).is_err() {
                tracing::debug!("Event receiver dropped; detection event discarded");
            }
        }
    }
}
