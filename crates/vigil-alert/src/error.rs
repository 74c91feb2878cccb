//! Error types for the notification scheduler.

use vigil_core::VigilError;

/// Errors from notification scheduling.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum AlertError {
    #[error("Notification scheduler is shut down")]
    ShuttingDown,
}

impl From<AlertError> for VigilError {
    fn from(err: AlertError) -> Self {
        match err {
            AlertError::ShuttingDown => VigilError::ShuttingDown,
        }
    }
}
