//! Callback boundary between the scheduler and the presentation layer.

use tokio::sync::mpsc::UnboundedSender;
use vigil_core::{DomainEvent, Occurrence, Timestamp};

/// Receives notification lifecycle callbacks.
///
/// Callbacks run while the scheduler holds its slot lock, which is what keeps
/// show and close strictly ordered. Implementations must return quickly and
/// must not call back into the scheduler from inside a callback.
pub trait NotificationListener: Send + Sync {
    /// An alert for `occurrence` became visible.
    fn on_show(&self, occurrence: &Occurrence);

    /// The visible alert finished closing.
    fn on_close(&self);
}

/// Forwards callbacks as [`DomainEvent`]s into an unbounded channel.
pub struct ChannelListener {
    tx: UnboundedSender<DomainEvent>,
}

impl ChannelListener {
    pub fn new(tx: UnboundedSender<DomainEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: DomainEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Notification receiver dropped; event discarded");
        }
    }
}

impl NotificationListener for ChannelListener {
    fn on_show(&self, occurrence: &Occurrence) {
        self.send(DomainEvent::NotificationShown {
            occurrence_id: occurrence.id(),
            category: occurrence.category().clone(),
            severity: occurrence.severity(),
            timestamp: Timestamp::now(),
        });
    }

    fn on_close(&self) {
        self.send(DomainEvent::NotificationClosed {
            timestamp: Timestamp::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use vigil_core::{Category, Severity};

    #[test]
    fn test_channel_listener_forwards_show_and_close() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let listener = ChannelListener::new(tx);
        let occurrence = Occurrence::new(Category::Cut, 75, Utc::now());

        listener.on_show(&occurrence);
        listener.on_close();

        match rx.try_recv().unwrap() {
            DomainEvent::NotificationShown {
                occurrence_id,
                category,
                severity,
                ..
            } => {
                assert_eq!(occurrence_id, occurrence.id());
                assert_eq!(category, Category::Cut);
                assert_eq!(severity, Severity::X);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(matches!(
            rx.try_recv().unwrap(),
            DomainEvent::NotificationClosed { .. }
        ));
    }

    #[test]
    fn test_channel_listener_tolerates_dropped_receiver() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        let listener = ChannelListener::new(tx);
        listener.on_close();
    }
}
