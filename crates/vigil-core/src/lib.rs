pub mod config;
pub mod error;
pub mod events;
pub mod severity;
pub mod types;

pub use config::VigilConfig;
pub use error::{Result, VigilError};
pub use events::DomainEvent;
pub use severity::classify;
pub use types::*;
