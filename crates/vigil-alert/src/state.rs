//! Notification visibility state machine.
//!
//! - Idle -> Showing (offer)
//! - Showing -> Showing (offer replaces the visible alert)
//! - Closing -> Showing (offer replaces an alert that is animating out)
//! - Showing -> Closing (auto-dismiss or operator dismiss)
//! - Closing -> Idle (exit transition finished)

use std::fmt;

/// Visibility of the single notification slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationPhase {
    /// Nothing on screen.
    Idle,
    /// An alert is visible and its auto-dismiss timer is running.
    Showing,
    /// The alert is playing its exit transition.
    Closing,
}

impl fmt::Display for NotificationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationPhase::Idle => write!(f, "Idle"),
            NotificationPhase::Showing => write!(f, "Showing"),
            NotificationPhase::Closing => write!(f, "Closing"),
        }
    }
}

impl NotificationPhase {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &NotificationPhase) -> bool {
        matches!(
            (self, target),
            (_, NotificationPhase::Showing)
                | (NotificationPhase::Showing, NotificationPhase::Closing)
                | (NotificationPhase::Closing, NotificationPhase::Idle)
        )
    }

    pub fn is_visible(&self) -> bool {
        !matches!(self, NotificationPhase::Idle)
    }
}
