//! Local alerts for the person running the watcher
//!
//! The poll cycle raises an alert when a cycle finds appointments and when
//! a cycle fails. Alerts are advisory: nothing reads a result back, and the
//! quiet flag suppresses them before they reach an [`Alerter`].
//!
//! ```text
//!   PollCycle ──► Alerter::notify(&Alert)
//!                    │
//!                    ├── TerminalAlerter  (bell on stderr + log line)
//!                    └── test doubles
//! ```

use std::io::Write;

use crate::utils::error::PollFailure;

/// Severity level of an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertSeverity {
    /// Something the user is waiting for happened
    Info,
    /// A cycle failed
    Warning,
}

impl AlertSeverity {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Something worth interrupting the user for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    /// A cycle found bookable appointments
    AppointmentsFound { count: usize, url: String },

    /// A cycle failed with the given classification
    PollFailed(PollFailure),
}

impl Alert {
    pub fn severity(&self) -> AlertSeverity {
        match self {
            Self::AppointmentsFound { .. } => AlertSeverity::Info,
            Self::PollFailed(_) => AlertSeverity::Warning,
        }
    }
}

/// Delivers alerts locally
pub trait Alerter: Send + Sync {
    fn notify(&self, alert: &Alert);
}

/// Rings the terminal bell: once for found appointments, twice for errors
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalAlerter;

impl TerminalAlerter {
    /// Bell sequence for an alert
    pub fn chime(alert: &Alert) -> &'static str {
        match alert.severity() {
            AlertSeverity::Info => "\x07",
            AlertSeverity::Warning => "\x07\x07",
        }
    }
}

impl Alerter for TerminalAlerter {
    fn notify(&self, alert: &Alert) {
        if let Alert::AppointmentsFound { count, url } = alert {
            tracing::info!(count = %count, url = %url, "Appointments available, book now");
        }

        let mut stderr = std::io::stderr();
        if let Err(e) = stderr
            .write_all(Self::chime(alert).as_bytes())
            .and_then(|_| stderr.flush())
        {
            tracing::debug!(error = %e, "Could not ring terminal bell");
        }
    }
}
