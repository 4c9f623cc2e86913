//! Poll, classify and publish
//!
//! - [`poll::PollCycle`] runs one round against the booking service for a
//!   leased identity and always produces a [`ResultSnapshot`]
//! - [`driver::Watcher`] repeats the cycle forever at a cadence derived from
//!   the identity pool, and publishes every snapshot to subscribers
//!
//! [`ResultSnapshot`]: crate::models::ResultSnapshot

pub mod driver;
pub mod poll;

pub use driver::Watcher;
pub use poll::PollCycle;
