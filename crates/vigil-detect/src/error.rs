//! Error types for detection intake.

use vigil_alert::AlertError;
use vigil_core::VigilError;
use vigil_store::StoreError;

/// Errors from turning a detection event into an occurrence.
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error("Detection duration is negative: {0}s")]
    NegativeDuration(i64),

    #[error("Detection duration is out of range: {0}s")]
    DurationOutOfRange(i64),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Notification error: {0}")]
    Alert(#[from] AlertError),
}

impl DetectError {
    /// The event itself was malformed, as opposed to a downstream failure.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            DetectError::NegativeDuration(_) | DetectError::DurationOutOfRange(_)
        )
    }
}

impl From<DetectError> for VigilError {
    fn from(err: DetectError) -> Self {
        match err {
            DetectError::Alert(e) => e.into(),
            DetectError::Store(e) => e.into(),
            other => VigilError::InvalidArgument(other.to_string()),
        }
    }
}
