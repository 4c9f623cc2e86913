//! Identity rotation with per-identity cooldown
//!
//! Identities sit in a FIFO queue. A lease pops the front identity, waits
//! out whatever is left of its cooldown, and hands it to the caller. When the
//! [`Lease`] is dropped the identity is stamped and pushed to the back, so
//! rotation is round-robin and an identity is never held twice at once.

use std::ops::Deref;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;

use super::Identity;
use crate::utils::error::IdentityError;
use crate::utils::remaining;

/// Fixed set of identities handed out under a cooldown
pub struct IdentityPool {
    /// Back of the rotation queue
    queue_tx: mpsc::UnboundedSender<Identity>,

    /// Front of the rotation queue; tokio's mutex is fair, so waiters are
    /// served in arrival order
    queue_rx: Mutex<mpsc::UnboundedReceiver<Identity>>,

    /// Number of identities, at least 1
    size: usize,

    /// Minimum idle time between two leases of the same identity
    cooldown: Duration,
}

impl IdentityPool {
    /// Create a pool; an empty list yields a single direct identity
    pub fn new(identities: Vec<Identity>, cooldown: Duration) -> Self {
        let identities = if identities.is_empty() {
            vec![Identity::direct()]
        } else {
            identities
        };

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let size = identities.len();
        for identity in identities {
            // Receiver is alive; send cannot fail here
            let _ = queue_tx.send(identity);
        }

        Self {
            queue_tx,
            queue_rx: Mutex::new(queue_rx),
            size,
            cooldown,
        }
    }

    /// Number of identities in rotation
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Poll cadence that asks each identity for one request per `base`
    pub fn effective_interval(&self, base: Duration) -> Duration {
        let size = u32::try_from(self.size).unwrap_or(u32::MAX);
        base / size
    }

    /// Lease the next identity in rotation
    ///
    /// Waits for an identity to come back if all are leased, then for the
    /// rest of its cooldown. Only the queue pop is serialized; the cooldown
    /// wait does not block other callers.
    pub async fn lease(&self) -> Result<Lease, IdentityError> {
        let identity = {
            let mut queue = self.queue_rx.lock().await;
            queue.recv().await.ok_or(IdentityError::PoolClosed)?
        };

        let wait = identity
            .last_used()
            .map(|last_used| remaining(self.cooldown, last_used.elapsed()))
            .unwrap_or(Duration::ZERO);

        // Guard first, so a cancelled wait still returns the identity
        let lease = Lease {
            identity,
            queue: self.queue_tx.clone(),
        };

        if !wait.is_zero() {
            tracing::debug!(
                identity = %lease.label(),
                wait_ms = wait.as_millis() as u64,
                "Waiting for identity cooldown"
            );
            tokio::time::sleep(wait).await;
        }

        Ok(lease)
    }
}

impl std::fmt::Debug for IdentityPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityPool")
            .field("size", &self.size)
            .field("cooldown", &self.cooldown)
            .finish()
    }
}

/// Exclusive hold on one identity
///
/// Released exactly once, on drop, whether the work succeeded or not.
#[derive(Debug)]
pub struct Lease {
    identity: Identity,
    queue: mpsc::UnboundedSender<Identity>,
}

impl Deref for Lease {
    type Target = Identity;

    fn deref(&self) -> &Identity {
        &self.identity
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        let mut identity = std::mem::replace(&mut self.identity, Identity::direct());
        identity.mark_used(Instant::now());
        // Fails only when the pool itself is gone
        let _ = self.queue.send(identity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_of(n: usize, cooldown_secs: u64) -> IdentityPool {
        let identities = (0..n)
            .map(|i| Identity::new(format!("http://10.0.0.{i}:3128"), None, None))
            .collect();
        IdentityPool::new(identities, Duration::from_secs(cooldown_secs))
    }

    #[test]
    fn test_empty_pool_is_direct() {
        let pool = IdentityPool::new(Vec::new(), Duration::from_secs(180));
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn test_effective_interval() {
        let pool = pool_of(3, 180);
        assert_eq!(pool.cooldown(), Duration::from_secs(180));
        assert_eq!(
            pool.effective_interval(Duration::from_secs(180)),
            Duration::from_secs(60)
        );

        let single = pool_of(1, 180);
        assert_eq!(
            single.effective_interval(Duration::from_secs(180)),
            Duration::from_secs(180)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_lease_does_not_wait() {
        let pool = pool_of(2, 180);
        let start = Instant::now();

        let lease = pool.lease().await.unwrap();
        assert_eq!(lease.proxy(), Some("http://10.0.0.0:3128"));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_stamps_and_requeues() {
        let pool = pool_of(1, 30);

        let lease = pool.lease().await.unwrap();
        assert!(lease.last_used().is_none());
        drop(lease);

        let released_at = Instant::now();
        let lease = pool.lease().await.unwrap();
        assert_eq!(lease.last_used(), Some(released_at));
        assert!(released_at.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_already_elapsed() {
        let pool = pool_of(1, 30);
        drop(pool.lease().await.unwrap());

        tokio::time::sleep(Duration::from_secs(45)).await;
        let before = Instant::now();
        let _lease = pool.lease().await.unwrap();
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_return_when_all_leased() {
        let pool = std::sync::Arc::new(pool_of(1, 0));
        let held = pool.lease().await.unwrap();

        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.lease().await.map(|l| l.label()) })
        };

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!waiter.is_finished());

        drop(held);
        assert_eq!(waiter.await.unwrap().unwrap(), "10.0.0.0:3128");
    }
}
