//! Centralized CLI error handling with user-facing messages.

use std::fmt;
use std::io;

use xpropagator::service::ServiceError;

/// Errors surfaced to the terminal user.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded.
    Config(String),
    /// Command-line arguments were unusable.
    Args(String),
    /// Logging or filesystem setup failed.
    Io(io::Error),
    /// The service rejected or failed the request.
    Service(ServiceError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Args(msg) => write!(f, "argument error: {}", msg),
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Service(e) => write!(f, "service error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Service(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ServiceError> for CliError {
    fn from(e: ServiceError) -> Self {
        Self::Service(e)
    }
}
