//! Month-view calendar parser
//!
//! Bookable days are rendered as `<td class="buchbar"><a href=".../day/{ts}/">`
//! where `{ts}` is a unix timestamp. Other cells (`nichtbuchbar`, past days,
//! padding) carry no link we care about.

use chrono::{DateTime, NaiveDateTime};
use chrono_tz::Tz;
use scraper::{Html, Selector};
use std::sync::OnceLock;

use super::SlotParser;
use crate::utils::error::ParseError;

fn bookable_link_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("td.buchbar a").expect("Invalid CSS selector"))
}

/// Parser for the booking service's calendar month view
#[derive(Debug, Clone)]
pub struct BookableSlotParser {
    timezone: Tz,
}

impl BookableSlotParser {
    /// Create a parser yielding wall-clock times in `timezone`
    #[must_use]
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    /// Read the unix timestamp at the end of a slot link
    pub fn timestamp_from_href(href: &str) -> Result<i64, ParseError> {
        href.trim_end_matches('/')
            .rsplit('/')
            .next()
            .and_then(|segment| segment.parse::<i64>().ok())
            .ok_or_else(|| ParseError::InvalidSlotLink(href.to_string()))
    }

    fn wall_clock(&self, timestamp: i64) -> Result<NaiveDateTime, ParseError> {
        DateTime::from_timestamp(timestamp, 0)
            .map(|instant| instant.with_timezone(&self.timezone).naive_local())
            .ok_or(ParseError::TimestampOutOfRange(timestamp))
    }
}

impl SlotParser for BookableSlotParser {
    fn parse(&self, page: &str) -> Result<Vec<NaiveDateTime>, ParseError> {
        let document = Html::parse_document(page);

        document
            .select(bookable_link_selector())
            .filter_map(|link| link.value().attr("href"))
            .map(|href| Self::timestamp_from_href(href).and_then(|ts| self.wall_clock(ts)))
            .collect()
    }
}
