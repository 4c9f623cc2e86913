//! Startup and serving errors for the slotwatch crate
//!
//! Poll-cycle failures never reach this type: they are folded into a
//! snapshot status by [`crate::watcher::poll`] through
//! [`crate::utils::error::PollFailure`]. `Error` covers building the target
//! and running the subscriber server, where failing is the right answer.

use std::io;
use thiserror::Error;

/// Unified error type for the slotwatch crate
#[derive(Error, Debug)]
pub enum Error {
    /// Subscriber server errors
    #[error("Server error: {0}")]
    Server(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a server error
    pub fn server(msg: impl Into<String>) -> Self {
        Self::Server(msg.into())
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let err = Error::config("port must be non-zero");
        assert_eq!(err.to_string(), "Config error: port must be non-zero");
    }

    #[test]
    fn test_io_conversion() {
        let err: Error = io::Error::new(io::ErrorKind::AddrInUse, "taken").into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.to_string(), "I/O error: taken");
    }
}
