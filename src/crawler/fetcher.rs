//! HTTP fetcher bound to one identity
//!
//! Each poll cycle opens an [`HttpSession`] for its leased identity: a fresh
//! reqwest client routed through the identity's proxy, with its own cookie
//! jar and the browser header set. Both calendar pages of a cycle are
//! fetched through the same session.

use async_trait::async_trait;
use reqwest::{Client, Proxy};
use std::time::Duration;

use super::headers::build_identity_headers;
use super::{PageSession, SessionFactory};
use crate::identity::Identity;
use crate::utils::error::FetchError;

/// Opens reqwest-backed sessions for identities
#[derive(Debug, Clone)]
pub struct HttpSessionFactory {
    /// Per-request timeout budget
    timeout: Duration,
}

impl HttpSessionFactory {
    /// Create a factory whose sessions time out after `timeout` per page
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Build the client for one identity
    ///
    /// # Errors
    ///
    /// Returns `FetchError::InvalidSession` if the proxy URL or credentials
    /// are unusable, or the client cannot be built.
    pub fn build_client(&self, identity: &Identity) -> Result<Client, FetchError> {
        let mut builder = Client::builder()
            .timeout(self.timeout)
            .gzip(true)
            .cookie_store(true)
            .default_headers(build_identity_headers(identity)?);

        builder = match identity.proxy() {
            Some(proxy) => builder.proxy(
                Proxy::all(proxy)
                    .map_err(|e| FetchError::InvalidSession(format!("proxy {proxy}: {e}")))?,
            ),
            None => builder.no_proxy(),
        };

        builder
            .build()
            .map_err(|e| FetchError::InvalidSession(e.to_string()))
    }
}

impl Default for HttpSessionFactory {
    fn default() -> Self {
        Self::new(Duration::from_secs(20))
    }
}

impl SessionFactory for HttpSessionFactory {
    fn open(&self, identity: &Identity) -> Result<Box<dyn PageSession>, FetchError> {
        let client = self.build_client(identity)?;
        Ok(Box::new(HttpSession {
            client,
            identity: identity.label(),
        }))
    }
}

/// One logical browsing session: shared connection pool and cookie jar
#[derive(Debug)]
pub struct HttpSession {
    client: Client,
    identity: String,
}

#[async_trait]
impl PageSession for HttpSession {
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        tracing::debug!(url = %url, identity = %self.identity, "Fetching calendar page");

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        Ok(response.text().await?)
    }
}
