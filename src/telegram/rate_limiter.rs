//! Spacing for outgoing Bot API calls.
//!
//! Telegram answers bursts to a single group with 429 errors. Outgoing
//! messages reserve consecutive slots `min_interval` apart, and a flood
//! wait from the server pushes the next free slot back.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Hands out send slots at least `min_interval` apart.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,

    /// Earliest instant the next call may go out.
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// Reserves the next slot and sleeps until it arrives.
    ///
    /// Returns the duration waited (0 if no wait was needed).
    pub async fn acquire(&self) -> Duration {
        let wait = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = next.map_or(now, |n| n.max(now));
            *next = Some(slot + self.min_interval);
            slot - now
        };

        if !wait.is_zero() {
            debug!("Rate limiter: waiting {:?} before next call", wait);
            tokio::time::sleep(wait).await;
        }
        wait
    }

    /// Pushes the next slot back after Telegram asked us to slow down.
    pub async fn handle_flood_wait(&self, wait_seconds: u32) {
        warn!("Received flood wait from Telegram: {} seconds", wait_seconds);

        let resume_at = Instant::now() + Duration::from_secs(u64::from(wait_seconds));
        let mut next = self.next_slot.lock().await;
        *next = Some(next.map_or(resume_at, |n| n.max(resume_at)));
    }

    /// Time until a call would go out without waiting.
    pub async fn time_until_allowed(&self) -> Duration {
        let next = self.next_slot.lock().await;
        next.map_or(Duration::ZERO, |n| n.saturating_duration_since(Instant::now()))
    }
}
