// src/checker/retry.rs
// =============================================================================
// Backoff schedule shared by the link prober and the license resolver.
//
// delay(attempt) = base * 2^attempt + uniform(jitter_min, jitter_max)
//
// With the defaults that is roughly 2-3s, 3-4s, 5-6s for three retries.
// Keeping the schedule a plain function of the attempt number means callers
// run an ordinary bounded loop and the schedule can be tested on its own.
// =============================================================================

use rand::Rng;
use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one
    pub max_retries: u32,
    /// Multiplied by 2^attempt
    pub base: Duration,
    /// Seconds of random jitter added to every delay
    pub jitter: (f64, f64),
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base: Duration::from_secs(1),
            jitter: (1.0, 2.0),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Total number of requests a caller may issue
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Whether another attempt is allowed after `attempt` (0-based) failed
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Delay before the retry that follows a failed `attempt`, without jitter
    pub fn backoff(&self, attempt: u32) -> Duration {
        // 2^31 seconds is already absurd; clamp so the shift can't overflow
        self.base * 2u32.saturating_pow(attempt.min(31))
    }

    /// Full delay: exponential part plus a random jitter
    pub fn delay<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        self.backoff(attempt) + jitter(self.jitter, rng)
    }

    /// Sleeps for `delay(attempt)` and returns how long that was
    pub async fn wait(&self, attempt: u32) -> Duration {
        let delay = self.delay(attempt, &mut rand::thread_rng());
        tokio::time::sleep(delay).await;
        delay
    }
}

// Uniform random duration in [lo, hi] seconds. A reversed or negative range
// is normalised rather than panicking inside rand.
pub fn jitter<R: Rng + ?Sized>((lo, hi): (f64, f64), rng: &mut R) -> Duration {
    let lo = lo.max(0.0);
    let hi = hi.max(lo);
    let secs = if hi > lo { rng.gen_range(lo..=hi) } else { lo };
    Duration::from_secs_f64(secs)
}
