use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION,
    DNT, FROM, UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};

use crate::identity::Identity;
use crate::utils::error::FetchError;

/// Desktop Firefox user agent sent with every request
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:133.0) Gecko/20100101 Firefox/133.0";

/// Header carrying an identity's client id
pub const CLIENT_ID_HEADER: &str = "x-client-id";

/// Build browser-like headers for calendar page requests
///
/// Mirrors a top-level navigation in Firefox so the booking service's
/// anti-bot checks see an ordinary visitor. `Accept-Encoding` is left to
/// reqwest, which only decompresses what it negotiated itself.
///
/// # Examples
///
/// ```
/// use slotwatch::crawler::headers::{build_browser_headers, BROWSER_USER_AGENT};
///
/// let headers = build_browser_headers();
/// assert_eq!(headers.get("user-agent").unwrap(), BROWSER_USER_AGENT);
/// ```
pub fn build_browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("de-DE,de;q=0.8,en-US;q=0.5,en;q=0.3"),
    );
    headers.insert(DNT, HeaderValue::from_static("1"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

    // Sec-Fetch headers for a top-level navigation
    headers.insert(
        HeaderName::from_static("sec-gpc"),
        HeaderValue::from_static("1"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-dest"),
        HeaderValue::from_static("document"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-mode"),
        HeaderValue::from_static("navigate"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("none"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-user"),
        HeaderValue::from_static("?1"),
    );
    headers.insert(
        HeaderName::from_static("priority"),
        HeaderValue::from_static("u=0, i"),
    );

    headers
}

/// Browser headers plus the identity's credential pair
///
/// # Errors
///
/// Returns `FetchError::InvalidSession` if a credential is not a valid
/// header value.
pub fn build_identity_headers(identity: &Identity) -> Result<HeaderMap, FetchError> {
    let mut headers = build_browser_headers();

    if let Some(email) = identity.email() {
        let value = HeaderValue::from_str(email)
            .map_err(|e| FetchError::InvalidSession(format!("credential email: {e}")))?;
        headers.insert(FROM, value);
    }

    if let Some(client_id) = identity.client_id() {
        let value = HeaderValue::from_str(client_id)
            .map_err(|e| FetchError::InvalidSession(format!("credential id: {e}")))?;
        headers.insert(HeaderName::from_static(CLIENT_ID_HEADER), value);
    }

    Ok(headers)
}
