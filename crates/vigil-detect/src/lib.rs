//! Detection intake for Vigil.
//!
//! A [`Detector`] produces raw detection events, the [`DetectionAdapter`]
//! turns each valid event into a stored occurrence and an on-screen alert,
//! and the [`DetectionMonitor`] drives the two until shutdown.

pub mod adapter;
pub mod detector;
pub mod error;
pub mod monitor;

pub use adapter::DetectionAdapter;
pub use detector::{Detector, RandomSampler, ScriptedDetector};
pub use error::DetectError;
pub use monitor::{DetectionMonitor, MonitorStats};
