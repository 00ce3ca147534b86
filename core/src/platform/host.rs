//! Host capabilities the service calls but does not implement

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors reported by host capabilities
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlatformError {
    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Wake lock error: {0}")]
    WakeLock(String),

    #[error("Location backend error: {0}")]
    Location(String),
}

/// Time-bounded partial wake-lock
///
/// Not reference counted: one `release` undoes any number of `acquire`s.
#[cfg_attr(test, mockall::automock)]
pub trait WakeLock: Send + Sync {
    fn acquire(&self, tag: &str, timeout: Duration) -> Result<(), PlatformError>;
    fn is_held(&self) -> bool;
    fn release(&self) -> Result<(), PlatformError>;
}

/// The process hosting the service
#[cfg_attr(test, mockall::automock)]
pub trait ServiceHost: Send + Sync {
    /// Ask the supervisor to stop this service process
    fn stop_self(&self);
}
