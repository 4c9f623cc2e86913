//! Calendar URL derivation for the booking service
//!
//! The service page a user bookmarks (e.g.
//! `https://service.berlin.de/dienstleistung/120686/`) ends in a service id.
//! Each cycle fetches two calendar views for that service:
//!
//! - `{base}/all/{service_id}/`: the calendar opened on the current month
//! - `{base}/day/{unix_ts}/`: the calendar opened on day 1 of next month,
//!   where `unix_ts` is local midnight in the service's timezone

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{Error, Result};

/// Default calendar root of the booking service
pub const DEFAULT_BOOKING_BASE: &str = "https://service.berlin.de/terminvereinbarung/termin";

/// Extract the service id from a service page URL
///
/// # Examples
///
/// ```
/// use slotwatch::crawler::url::service_id;
///
/// let id = service_id("https://service.berlin.de/dienstleistung/120686/").unwrap();
/// assert_eq!(id, "120686");
/// ```
pub fn service_id(service_page_url: &str) -> Result<String> {
    let without_fragment = service_page_url.split(['?', '#']).next().unwrap_or_default();
    let id = without_fragment
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    if id.is_empty() || id.contains(':') {
        return Err(Error::config(format!(
            "Cannot find a service id in '{service_page_url}'"
        )));
    }

    Ok(id.to_string())
}

/// Local midnight on day 1 of the month after `now`
///
/// December rolls over into January of the next year.
pub fn next_month_start(now: DateTime<Utc>, timezone: Tz) -> DateTime<Tz> {
    let local = now.with_timezone(&timezone);
    let (year, month) = if local.month() == 12 {
        (local.year() + 1, 1)
    } else {
        (local.year(), local.month() + 1)
    };

    let midnight = NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or_default();

    timezone
        .from_local_datetime(&midnight)
        .earliest()
        .unwrap_or_else(|| timezone.from_utc_datetime(&midnight))
}

/// The pair of calendar pages polled for one service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarTarget {
    base: String,
    service_id: String,
    timezone: Tz,
}

impl CalendarTarget {
    /// Build a target from the service page URL the user configured
    pub fn from_service_page(service_page_url: &str, base: &str, timezone: Tz) -> Result<Self> {
        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
            service_id: service_id(service_page_url)?,
            timezone,
        })
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Calendar page opened on the current month
    pub fn current_month_url(&self) -> String {
        format!("{}/all/{}/", self.base, self.service_id)
    }

    /// Calendar page opened on day 1 of the month after `now`
    pub fn next_month_url(&self, now: DateTime<Utc>) -> String {
        let start = next_month_start(now, self.timezone);
        format!("{}/day/{}/", self.base, start.timestamp())
    }

    /// Both pages in fetch order
    pub fn urls(&self, now: DateTime<Utc>) -> [String; 2] {
        [self.current_month_url(), self.next_month_url(now)]
    }
}
