// Core data structures for slotwatch

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::utils::error::PollFailure;
use crate::utils::format_json_time;

/// Status code of a successful cycle
pub const STATUS_OK: u16 = 200;

/// Result of one poll cycle, as published to subscribers
///
/// Immutable once built. Appointment instants are kept unique and sorted
/// ascending by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSnapshot {
    time: DateTime<Utc>,
    status: u16,
    message: Option<String>,
    appointments: Vec<DateTime<Utc>>,
    last_found: Option<DateTime<Utc>>,
}

impl ResultSnapshot {
    /// Snapshot served before the first cycle completes
    pub fn initial(time: DateTime<Utc>) -> Self {
        Self {
            time,
            status: STATUS_OK,
            message: None,
            appointments: Vec::new(),
            last_found: None,
        }
    }

    /// Successful cycle; duplicates are merged and the result sorted
    pub fn success(
        time: DateTime<Utc>,
        appointments: impl IntoIterator<Item = DateTime<Utc>>,
    ) -> Self {
        let appointments: BTreeSet<_> = appointments.into_iter().collect();
        Self {
            time,
            status: STATUS_OK,
            message: None,
            appointments: appointments.into_iter().collect(),
            last_found: None,
        }
    }

    /// Failed cycle with the status and message of its failure class
    pub fn failure(time: DateTime<Utc>, failure: &PollFailure) -> Self {
        Self {
            time,
            status: failure.status_code(),
            message: Some(failure.message()),
            appointments: Vec::new(),
            last_found: None,
        }
    }

    /// Set "last found" from this cycle or carry it over from `previous`
    ///
    /// A cycle that found appointments stamps its own completion time;
    /// an empty one inherits whatever `previous` had.
    #[must_use]
    pub fn carry_forward(mut self, previous: &ResultSnapshot) -> Self {
        self.last_found = if self.appointments.is_empty() {
            previous.last_found
        } else {
            Some(self.time)
        };
        self
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn appointments(&self) -> &[DateTime<Utc>] {
        &self.appointments
    }

    pub fn last_found(&self) -> Option<DateTime<Utc>> {
        self.last_found
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Wire representation sent over the subscriber channel
    pub fn to_message(&self) -> SnapshotMessage {
        SnapshotMessage {
            time: format_json_time(&self.time),
            status: self.status,
            message: self.message.clone(),
            appointment_dates: self.appointments.iter().map(format_json_time).collect(),
            last_appointments_found_on: self.last_found.as_ref().map(format_json_time),
        }
    }

    /// Serialize once for fan-out
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.to_message())
    }
}

/// JSON object pushed to subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMessage {
    pub time: String,
    pub status: u16,
    pub message: Option<String>,
    pub appointment_dates: Vec<String>,
    pub last_appointments_found_on: Option<String>,
}
