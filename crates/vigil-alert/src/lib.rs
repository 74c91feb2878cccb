//! Occurrence alerting for Vigil.
//!
//! Surfaces the most recent detection as a single time-bounded alert that
//! closes by itself or on operator dismissal, and is replaced (never queued)
//! when a newer detection arrives.

pub mod error;
pub mod listener;
pub mod scheduler;
pub mod state;

pub use error::AlertError;
pub use listener::{ChannelListener, NotificationListener};
pub use scheduler::{NotificationScheduler, NotificationSnapshot, OfferPermit, SchedulerTimings};
pub use state::NotificationPhase;
