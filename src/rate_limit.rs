//! System-wide request spacing.
//!
//! Article requests go through one [`RateLimiter`] no matter how many
//! workers are running. A request may start only once `base + jitter` has
//! passed since the previous request started *and* since the last one
//! finished, so a slow page never eats the pause before the next one.
//! Jitter is drawn uniformly from `0..=jitter` on every slot.

use rand::{Rng, rng};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tracing::trace;

#[derive(Debug)]
pub struct RateLimiter {
    base: Duration,
    jitter: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(base: Duration, jitter: Duration) -> Self {
        Self {
            base,
            jitter,
            next_slot: Mutex::new(None),
        }
    }

    /// Wait for the next free slot and claim it. The first call returns
    /// immediately.
    pub async fn acquire(&self) {
        loop {
            let at = {
                let mut next_slot = self.next_slot.lock().await;
                let now = Instant::now();
                match *next_slot {
                    Some(at) if at > now => at,
                    _ => {
                        *next_slot = Some(now + self.interval());
                        return;
                    }
                }
            };
            trace!(wait = ?at.saturating_duration_since(Instant::now()), "Waiting for request slot");
            sleep_until(at).await;
        }
    }

    /// Record that a request just finished: the next slot is at least one
    /// interval from now.
    pub async fn release(&self) {
        let mut next_slot = self.next_slot.lock().await;
        let after = Instant::now() + self.interval();
        *next_slot = Some(next_slot.map_or(after, |at| at.max(after)));
    }

    fn interval(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.base;
        }
        self.base + Duration::from_millis(rng().random_range(0..=jitter_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_spacing_between_acquires() {
        let limiter = RateLimiter::new(Duration::from_millis(500), Duration::ZERO);
        let t0 = Instant::now();
        limiter.acquire().await;
        assert!(t0.elapsed() < Duration::from_millis(1));
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(t0.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_jitter_stays_in_range() {
        let limiter = RateLimiter::new(Duration::from_millis(100), Duration::from_millis(50));
        for _ in 0..20 {
            let interval = limiter.interval();
            assert!(interval >= Duration::from_millis(100));
            assert!(interval <= Duration::from_millis(150));
        }
    }

    #[tokio::test]
    async fn test_zero_delay_never_waits() {
        let limiter = RateLimiter::new(Duration::ZERO, Duration::ZERO);
        let t0 = std::time::Instant::now();
        for _ in 0..10 {
            limiter.acquire().await;
        }
        assert!(t0.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spacing_counts_from_end_of_slow_request() {
        let limiter = RateLimiter::new(Duration::from_millis(1000), Duration::ZERO);
        limiter.acquire().await;
        tokio::time::sleep(Duration::from_secs(3)).await;
        limiter.release().await;
        let finished = Instant::now();

        limiter.acquire().await;
        assert!(finished.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_before_first_acquire_delays_it() {
        let limiter = RateLimiter::new(Duration::from_millis(500), Duration::ZERO);
        let t0 = Instant::now();
        limiter.release().await;
        limiter.acquire().await;
        assert!(t0.elapsed() >= Duration::from_millis(500));
    }
}
