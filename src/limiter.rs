use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{self, Instant};

/// Enforces a minimum spacing between requests to the remote service,
/// no matter how many tasks issue them.
///
/// Clones share the same schedule.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Arc::new(Mutex::new(None)),
        }
    }

    /// A limiter that never waits.
    pub fn unlimited() -> Self {
        RateLimiter::new(Duration::from_secs(0))
    }

    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits for the next free slot.
    ///
    /// The first request passes immediately, every further one at least
    /// `interval` after the previous slot.
    pub async fn until_ready(&self) {
        if self.interval == Duration::from_secs(0) {
            return;
        }
        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next_slot {
                Some(next) if next > now => next,
                _ => now,
            };
            *next_slot = Some(slot + self.interval);
            slot
        };
        time::sleep_until(slot).await;
    }
}
