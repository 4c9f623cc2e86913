//! Error types for the slotwatch poller
//!
//! This module defines the domain error types produced by the fetch, parse
//! and identity layers. The poll cycle folds them into [`PollFailure`].

use thiserror::Error;

/// Errors that can occur while fetching a calendar page
#[derive(Error, Debug)]
pub enum FetchError {
    /// Remote answered with a non-2xx status
    #[error("Remote returned HTTP {0}")]
    Status(u16),

    /// DNS failure, refused or reset connection, proxy unreachable
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Request exceeded its timeout budget
    #[error("Request timeout")]
    Timeout,

    /// Invalid proxy or header configuration for an identity
    #[error("Invalid session configuration: {0}")]
    InvalidSession(String),

    /// Any other transport failure (body decoding, redirect loops, ...)
    #[error("HTTP request failed: {0}")]
    Other(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Other(err.to_string())
        }
    }
}

/// Errors that can occur while parsing a calendar page
#[derive(Error, Debug)]
pub enum ParseError {
    /// A bookable cell link did not end in a unix timestamp
    #[error("Invalid slot link: {0}")]
    InvalidSlotLink(String),

    /// Timestamp is outside the representable range
    #[error("Timestamp out of range: {0}")]
    TimestampOutOfRange(i64),

    /// Wall-clock time does not exist in the target timezone
    #[error("Nonexistent local time: {0}")]
    NonexistentLocalTime(String),
}

/// Errors from loading or leasing identities
#[derive(Error, Debug)]
pub enum IdentityError {
    /// Identity file could not be read
    #[error("Failed to read identity file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Line in the identity file is malformed
    #[error("Malformed identity on line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    /// Rotation queue was closed while waiting for a lease
    #[error("Identity rotation closed")]
    PoolClosed,
}

/// Closed classification of a failed poll cycle
///
/// Every failure maps to exactly one variant; the poll cycle matches on it
/// exhaustively to pick the snapshot status code and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollFailure {
    /// Remote returned a non-2xx response
    Rejected { status: u16 },

    /// Remote could not be reached
    Unreachable,

    /// A page fetch exceeded the timeout budget
    TimedOut,

    /// Anything else, carrying the underlying error text
    Unexpected(String),
}

impl PollFailure {
    /// Snapshot status code for this failure class
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Rejected { .. } | Self::Unreachable => 502,
            Self::TimedOut => 504,
            Self::Unexpected(_) => 500,
        }
    }

    /// Human-readable message pushed to subscribers
    pub fn message(&self) -> String {
        match self {
            Self::Rejected { status } => {
                format!("Could not fetch results from the booking service - Got HTTP {status}.")
            }
            Self::Unreachable => {
                "Could not fetch results from the booking service - Got connection error."
                    .to_string()
            }
            Self::TimedOut => {
                "Could not fetch results from the booking service - Request timed out.".to_string()
            }
            Self::Unexpected(text) => format!("An unknown error occurred: {text}"),
        }
    }
}

impl From<FetchError> for PollFailure {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Status(status) => Self::Rejected { status },
            FetchError::Connect(_) => Self::Unreachable,
            FetchError::Timeout => Self::TimedOut,
            other @ (FetchError::InvalidSession(_) | FetchError::Other(_)) => {
                Self::Unexpected(other.to_string())
            }
        }
    }
}

impl From<ParseError> for PollFailure {
    fn from(err: ParseError) -> Self {
        Self::Unexpected(err.to_string())
    }
}

impl From<IdentityError> for PollFailure {
    fn from(err: IdentityError) -> Self {
        Self::Unexpected(err.to_string())
    }
}
