//! Minimum spacing between outbound tile requests.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spaces request start times by at least `delay`.
///
/// Shared by the on-demand and prefetch paths so the tile server sees a
/// single, polite request stream. A zero delay makes [`RequestPacer::wait`]
/// return immediately.
#[derive(Debug)]
pub struct RequestPacer {
    delay: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RequestPacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_slot: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Waits until this caller's request slot.
    ///
    /// Slots are handed out in call order; the lock is only held while
    /// reserving, not while sleeping.
    pub async fn wait(&self) {
        if self.delay.is_zero() {
            return;
        }

        let start = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let start = next.map_or(now, |slot| slot.max(now));
            *next = Some(start + self.delay);
            start
        };

        tokio::time::sleep_until(start).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_zero_delay_does_not_wait() {
        let pacer = RequestPacer::new(Duration::ZERO);
        let start = std::time::Instant::now();
        for _ in 0..100 {
            pacer.wait().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_are_spaced() {
        let pacer = RequestPacer::new(Duration::from_millis(100));
        let start = Instant::now();

        pacer.wait().await;
        pacer.wait().await;
        pacer.wait().await;

        // First request goes out immediately, the next two are spaced.
        assert!(start.elapsed() >= Duration::from_millis(200));
    }
}
