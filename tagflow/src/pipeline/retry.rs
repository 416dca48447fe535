//! Retry with exponential backoff.
//!
//! [`retry`] runs a fallible asynchronous operation up to
//! `max_retries + 1` times and converts the final failure into an
//! [`ErrorRecord`]. It never panics and never propagates the operation's
//! error type; panics raised while polling the operation are caught and
//! reported the same way.

use futures::FutureExt;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::core::ErrorRecord;

/// Jitter applied on top of the computed backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// Exact backoff delays.
    #[default]
    None,
    /// Random from 0 to delay
    Full,
    /// Half fixed, half random
    Equal,
}

/// Retry configuration.
///
/// The wait between attempt `i` and `i + 1` (zero-indexed) is
/// `base_delay_ms * backoff_factor^i`, optionally capped by `max_delay_ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds.
    pub base_delay_ms: u64,
    /// Multiplier applied per attempt.
    pub backoff_factor: f64,
    /// Optional cap on a single delay.
    pub max_delay_ms: Option<u64>,
    /// Jitter strategy.
    pub jitter: JitterStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 1000,
            backoff_factor: 2.0,
            max_delay_ms: None,
            jitter: JitterStrategy::None,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of retries.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub const fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the backoff factor.
    #[must_use]
    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Caps every delay.
    #[must_use]
    pub const fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = Some(delay);
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub const fn with_jitter(mut self, jitter: JitterStrategy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Total attempts including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Backoff before retrying after attempt `attempt` (zero-indexed), without jitter.
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        #[allow(clippy::cast_precision_loss)]
        let mut millis = self.base_delay_ms as f64 * self.backoff_factor.powi(exponent);
        if millis.is_nan() || millis < 0.0 {
            millis = 0.0;
        }
        if let Some(max) = self.max_delay_ms {
            #[allow(clippy::cast_precision_loss)]
            let max = max as f64;
            millis = millis.min(max);
        }
        // `as` saturates, so an infinite product becomes u64::MAX.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let millis = millis.round() as u64;
        Duration::from_millis(millis)
    }

    /// Backoff with jitter applied.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = self.backoff_for(attempt);
        match self.jitter {
            JitterStrategy::None => delay,
            JitterStrategy::Full => {
                if delay.is_zero() {
                    delay
                } else {
                    rand::thread_rng().gen_range(Duration::ZERO..=delay)
                }
            }
            JitterStrategy::Equal => {
                let half = delay / 2;
                if half.is_zero() {
                    delay
                } else {
                    half + rand::thread_rng().gen_range(Duration::ZERO..=half)
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic: <non-string payload>".to_string()
    }
}

/// Executes `operation` with retry and backoff.
///
/// Returns the first successful value, discarding earlier failures. When
/// every attempt fails, returns an [`ErrorRecord`] naming `phase_name`, the
/// last error's text, and the last attempt index (equal to
/// `policy.max_retries`). Waiting uses `tokio::time::sleep`, so only the
/// calling task is suspended.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    phase_name: &str,
    mut operation: F,
) -> Result<T, ErrorRecord>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts();
    let mut attempt: u32 = 0;

    loop {
        if attempt > 0 {
            info!(phase = %phase_name, attempt, "Retry attempt");
        }

        let outcome = AssertUnwindSafe(async { operation().await })
            .catch_unwind()
            .await;

        let message = match outcome {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => e.to_string(),
            Err(payload) => panic_message(payload.as_ref()),
        };

        if attempt >= policy.max_retries {
            error!(
                phase = %phase_name,
                attempt = attempt + 1,
                max_attempts,
                error = %message,
                "Max retries reached"
            );
            return Err(ErrorRecord::new(phase_name, message, attempt));
        }

        let delay = policy.delay_for(attempt);
        warn!(
            phase = %phase_name,
            attempt = attempt + 1,
            max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %message,
            "Attempt failed, waiting before retry"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
