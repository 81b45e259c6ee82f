//! Exponential-backoff retry for transient venue failures.

use std::time::Duration;

use log::warn;

use crate::error::BrokerError;

/// Attempt budget and backoff base.
///
/// Attempt `n` (1-based) is preceded by a sleep of `base_delay × 2^(n-2)`,
/// so the default policy waits 1 s then 2 s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before attempt `attempt` (0-based).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            Duration::ZERO
        } else {
            self.base_delay * 2u32.pow(attempt - 1)
        }
    }

    /// Run `op` until it succeeds, fails permanently, or the budget runs out.
    ///
    /// Only [`BrokerError::is_transient`] errors are retried; the last error
    /// is returned on exhaustion.
    pub fn run<T, F>(&self, what: &str, mut op: F) -> Result<T, BrokerError>
    where
        F: FnMut() -> Result<T, BrokerError>,
    {
        let attempts = self.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            let delay = self.delay_before(attempt);
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }

            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() => {
                    warn!("{what} failed (attempt {}/{attempts}): {e}", attempt + 1);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| BrokerError::Other(format!("{what}: no attempts made"))))
    }
}
