use serde::{Deserialize, Serialize};

use crate::types::{Category, OccurrenceId, Severity, Timestamp, Validation};

/// All domain events that can occur in the Vigil system.
///
/// Events are published by the detection monitor and the notification
/// listener, and consumed by the presentation boundary (the CLI prints them
/// as JSON lines).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DomainEvent {
    // =========================================================================
    // Detection Events
    // =========================================================================
    /// A detection was accepted and stored as a new occurrence.
    OccurrenceDetected {
        occurrence_id: OccurrenceId,
        category: Category,
        severity: Severity,
        duration_secs: u32,
        timestamp: Timestamp,
    },

    /// A detection event was malformed and rejected before storage.
    DetectionRejected { reason: String, timestamp: Timestamp },

    /// An operator recorded a verdict on an occurrence.
    OccurrenceValidated {
        occurrence_id: OccurrenceId,
        validation: Validation,
        timestamp: Timestamp,
    },

    // =========================================================================
    // Notification Events
    // =========================================================================
    /// An occurrence alert became visible.
    NotificationShown {
        occurrence_id: OccurrenceId,
        category: Category,
        severity: Severity,
        timestamp: Timestamp,
    },

    /// The visible alert finished closing.
    NotificationClosed { timestamp: Timestamp },

    // =========================================================================
    // Monitor Lifecycle Events
    // =========================================================================
    /// The detection loop started pulling from its detector.
    MonitorStarted { timestamp: Timestamp },

    /// The detection loop stopped.
    MonitorStopped {
        events_processed: u64,
        timestamp: Timestamp,
    },
}

impl DomainEvent {
    /// Returns the timestamp of the event.
    pub fn timestamp(&self) -> Timestamp {
        match self {
            DomainEvent::OccurrenceDetected { timestamp, .. }
            | DomainEvent::DetectionRejected { timestamp, .. }
            | DomainEvent::OccurrenceValidated { timestamp, .. }
            | DomainEvent::NotificationShown { timestamp, .. }
            | DomainEvent::NotificationClosed { timestamp }
            | DomainEvent::MonitorStarted { timestamp }
            | DomainEvent::MonitorStopped { timestamp, .. } => *timestamp,
        }
    }

    /// Returns a human-readable event name for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            DomainEvent::OccurrenceDetected { .. } => "occurrence_detected",
            DomainEvent::DetectionRejected { .. } => "detection_rejected",
            DomainEvent::OccurrenceValidated { .. } => "occurrence_validated",
            DomainEvent::NotificationShown { .. } => "notification_shown",
            DomainEvent::NotificationClosed { .. } => "notification_closed",
            DomainEvent::MonitorStarted { .. } => "monitor_started",
            DomainEvent::MonitorStopped { .. } => "monitor_stopped",
        }
    }
}
