//! Calendar page parsing
//!
//! Extracts bookable slots from the booking service's calendar HTML. The
//! poll cycle only depends on [`SlotParser`]; [`BookableSlotParser`] is the
//! implementation for the service's month view.

pub mod calendar;

use chrono::NaiveDateTime;

use crate::utils::error::ParseError;

pub use calendar::BookableSlotParser;

/// Turns a calendar page into the wall-clock times of its bookable slots
///
/// Times are local to the service's timezone; the caller converts them to
/// instants.
pub trait SlotParser: Send + Sync {
    /// Parse one page
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` if a slot is present but cannot be decoded.
    fn parse(&self, page: &str) -> Result<Vec<NaiveDateTime>, ParseError>;
}
