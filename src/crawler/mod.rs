//! Calendar fetching for the booking service
//!
//! This module defines the fetch seam used by the poll cycle and its
//! reqwest implementation:
//!
//! - [`SessionFactory`] opens a [`PageSession`] bound to one identity
//! - [`fetcher::HttpSessionFactory`] routes sessions through the identity's
//!   proxy with browser-like headers
//! - [`url::CalendarTarget`] derives the two calendar URLs per cycle

pub mod fetcher;
pub mod headers;
pub mod url;

use async_trait::async_trait;

use crate::identity::Identity;
use crate::utils::error::FetchError;

pub use fetcher::{HttpSession, HttpSessionFactory};
pub use self::url::CalendarTarget;

/// Opens fetch sessions carrying an identity's egress and credentials
pub trait SessionFactory: Send + Sync {
    /// Open a session for `identity`
    ///
    /// # Errors
    ///
    /// Returns `FetchError::InvalidSession` if the identity cannot be
    /// turned into a working client.
    fn open(&self, identity: &Identity) -> Result<Box<dyn PageSession>, FetchError>;
}

/// A logical session; pages fetched through it share cookies and connections
#[async_trait]
pub trait PageSession: Send + Sync {
    /// GET `url` and return the body of a 2xx response
    ///
    /// # Errors
    ///
    /// Returns a `FetchError` classified as rejected status, connection
    /// failure, timeout or other.
    async fn get(&self, url: &str) -> Result<String, FetchError>;
}
