//! Driver loop: lease, poll, publish, sleep, forever

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::poll::PollCycle;
use crate::identity::IdentityPool;
use crate::models::ResultSnapshot;
use crate::server::SubscriberHub;
use crate::utils::error::PollFailure;
use crate::utils::{format_secs, remaining};

/// Owns the poll cadence and the single writer side of the shared snapshot
pub struct Watcher {
    pool: Arc<IdentityPool>,
    cycle: PollCycle,
    hub: Arc<SubscriberHub>,
    interval: Duration,
}

impl Watcher {
    /// Create a watcher polling every `base_interval / pool.size()`
    ///
    /// Each identity is then asked for one request per `base_interval`
    /// regardless of pool size.
    pub fn new(
        pool: Arc<IdentityPool>,
        cycle: PollCycle,
        hub: Arc<SubscriberHub>,
        base_interval: Duration,
    ) -> Self {
        let interval = pool.effective_interval(base_interval);
        Self {
            pool,
            cycle,
            hub,
            interval,
        }
    }

    /// Time between the starts of two cycles
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// One iteration without the trailing sleep
    ///
    /// Leases an identity, runs the cycle, releases the lease, carries
    /// "last found" forward from `previous` and publishes the result.
    pub async fn tick(&self, previous: &ResultSnapshot) -> ResultSnapshot {
        let snapshot = match self.pool.lease().await {
            Ok(lease) => self.cycle.run(&lease).await,
            Err(e) => {
                tracing::error!(error = %e, "Could not lease an identity");
                ResultSnapshot::failure(chrono::Utc::now(), &PollFailure::from(e))
            }
        };

        let next = snapshot.carry_forward(previous);

        match self.hub.publish(next.clone()).await {
            Ok(report) => tracing::debug!(
                delivered = report.delivered,
                dropped = report.dropped,
                skipped = report.skipped,
                "Published snapshot"
            ),
            Err(e) => tracing::error!(error = %e, "Could not serialize snapshot"),
        }

        next
    }

    /// Poll until the process exits
    pub async fn run(&self) {
        tracing::info!(
            service = %self.cycle.target().service_id(),
            url = %self.cycle.target().current_month_url(),
            identities = self.pool.size(),
            "Looking for appointments every {}",
            format_secs(self.interval)
        );

        let mut current = self.hub.snapshot().await.as_ref().clone();

        loop {
            let started = Instant::now();
            current = self.tick(&current).await;

            let pause = remaining(self.interval, started.elapsed());
            tracing::debug!(status = current.status(), pause = %format_secs(pause), "Cycle complete");
            tokio::time::sleep(pause).await;
        }
    }
}
