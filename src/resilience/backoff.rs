//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;

/// Computes the delay before each retry. Stateless apart from its configuration,
/// so one strategy can be shared by every request.
#[derive(Debug, Clone)]
pub struct RetryStrategy {
    config: RetryConfig,
}

impl RetryStrategy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Number of attempts a request may make, including the original one.
    pub fn attempt_budget(&self) -> u32 {
        if self.config.enabled {
            self.config.max_attempts.max(1)
        } else {
            1
        }
    }

    /// Delay before retry number `attempt` (1-based), using the thread-local RNG.
    ///
    /// Returns `None` when no further attempt should be made.
    pub fn next_backoff(&self, attempt: u32) -> Option<Duration> {
        self.next_backoff_with(attempt, &mut rand::thread_rng())
    }

    /// Same as [`next_backoff`](Self::next_backoff) with a caller-supplied RNG.
    pub fn next_backoff_with<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Option<Duration> {
        if !self.config.enabled || attempt >= self.config.max_attempts {
            return None;
        }
        if attempt == 0 {
            return Some(Duration::ZERO);
        }

        let max = self.config.max_interval().as_secs_f64();
        let exponent = (attempt - 1).min(i32::MAX as u32) as i32;
        let base = (self.config.initial_interval().as_secs_f64()
            * self.config.multiplier.powi(exponent))
        .min(max);

        let factor = self.config.random_factor;
        let jittered = if factor > 0.0 {
            base + base * rng.gen_range(-factor..=factor)
        } else {
            base
        };

        Some(Duration::from_secs_f64(jittered.clamp(0.0, max)))
    }
}
