//! slotwatch - Appointment slot watcher for the Berlin booking service
//!
//! Polls the service calendar through a rotating pool of identities and
//! pushes every result to WebSocket subscribers.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`identity`] - Identity file loading and the cooldown-enforcing pool
//! - [`crawler`] - Calendar URLs, browser headers and per-identity sessions
//! - [`parser`] - Bookable slot extraction from calendar pages
//! - [`watcher`] - The poll cycle and the driver loop
//! - [`server`] - Subscriber hub and WebSocket broadcast server
//! - [`notifications`] - Local alerts
//! - [`models`] - Result snapshot and its wire form
//! - [`utils`] - Domain errors and helpers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use slotwatch::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let target = CalendarTarget::from_service_page(
//!         "https://service.berlin.de/dienstleistung/120686/",
//!         slotwatch::crawler::url::DEFAULT_BOOKING_BASE,
//!         chrono_tz::Europe::Berlin,
//!     )?;
//!     let cycle = PollCycle::new(
//!         target,
//!         Arc::new(HttpSessionFactory::default()),
//!         Arc::new(BookableSlotParser::new(chrono_tz::Europe::Berlin)),
//!         Arc::new(TerminalAlerter),
//!     );
//!     let snapshot = cycle.run(&Identity::direct()).await;
//!     println!("{}", snapshot.to_json()?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crawler;
pub mod error;
pub mod identity;
pub mod models;
pub mod notifications;
pub mod parser;
pub mod server;
pub mod utils;
pub mod watcher;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::crawler::{CalendarTarget, HttpSessionFactory, PageSession, SessionFactory};
    pub use crate::error::{Error, Result};
    pub use crate::identity::{Identity, IdentityPool, Lease};
    pub use crate::models::{ResultSnapshot, SnapshotMessage};
    pub use crate::notifications::{Alert, Alerter, TerminalAlerter};
    pub use crate::parser::{BookableSlotParser, SlotParser};
    pub use crate::server::{AppState, BroadcastServer, SubscriberHub};
    pub use crate::utils::error::PollFailure;
    pub use crate::watcher::{PollCycle, Watcher};
}

// Direct re-exports for convenience
pub use models::ResultSnapshot;
