
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::{RagError, Result};

const MODEL_INIT_ATTEMPTS: u32 = 3;
const MODEL_INIT_MIN_DELAY_SECONDS: u64 = 4;
const MODEL_INIT_MAX_DELAY_SECONDS: u64 = 10;
const EXPONENTIAL_BACKOFF_BASE: u32 = 2;

/// Bounded exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Policy used when bringing up an embedding model: 3 attempts, 4s then 8s
    #[inline]
    pub fn model_init() -> Self {
        Self {
            max_attempts: MODEL_INIT_ATTEMPTS,
            initial_delay: Duration::from_secs(MODEL_INIT_MIN_DELAY_SECONDS),
            max_delay: Duration::from_secs(MODEL_INIT_MAX_DELAY_SECONDS),
        }
    }

    /// Delay to wait after the given failed attempt (1-based)
    #[inline]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = EXPONENTIAL_BACKOFF_BASE.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    #[inline]
    fn default() -> Self {
        Self::model_init()
    }
}

/// Run `init` until it succeeds or the policy's attempts are exhausted.
///
/// `sleep` is called between attempts so tests can observe the backoff without
/// waiting. Exhaustion is reported as [`RagError::ModelUnavailable`].
#[inline]
pub fn initialize_with_retry<T, S, F>(policy: &RetryPolicy, mut sleep: S, mut init: F) -> Result<T>
where
    S: FnMut(Duration),
    F: FnMut(u32) -> Result<T>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        debug!("Initialization attempt {}/{}", attempt, attempts);

        match init(attempt) {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!("Initialization attempt {}/{} failed: {}", attempt, attempts, err);
                last_error = Some(err);

                if attempt < attempts {
                    let delay = policy.delay_after(attempt);
                    debug!("Waiting {:?} before retry", delay);
                    sleep(delay);
                }
            }
        }
    }

    let reason = last_error.map_or_else(|| "no attempts made".to_string(), |e| e.to_string());
    error!("All {} initialization attempts failed: {}", attempts, reason);
    Err(RagError::ModelUnavailable(format!(
        "failed after {} attempts: {}",
        attempts, reason
    )))
}
