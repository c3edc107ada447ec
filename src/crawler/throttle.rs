//! Politeness throttle shared by every fetch
//!
//! Request starts are spaced at least `min_interval` apart across all
//! workers. A caller reserves the next free slot under a short lock and then
//! sleeps outside of it.

use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Reserves the next request slot and returns how long to wait for it
    pub fn reserve(&self, now: Instant) -> Duration {
        if self.min_interval.is_zero() {
            return Duration::ZERO;
        }

        let mut next_slot = self
            .next_slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let slot = match *next_slot {
            Some(slot) if slot > now => slot,
            _ => now,
        };
        *next_slot = Some(slot + self.min_interval);

        slot.saturating_duration_since(now)
    }

    /// Waits until this caller may start a request
    pub async fn wait(&self) {
        let delay = self.reserve(Instant::now());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
