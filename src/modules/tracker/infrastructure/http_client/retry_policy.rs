//! Retry policies for remote activity and metadata calls
//!
//! A policy fixes the per-attempt deadline, the attempt budget and the delay
//! between attempts. Server `Retry-After` hints take precedence over the
//! computed backoff.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::shared::errors::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum BackoffStrategy {
    /// `base * attempt`
    Linear,
    /// `base * multiplier^(attempt - 1)`
    Exponential { multiplier: f64 },
}

/// Configuration for retry behavior of one logical call
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Base delay between attempts
    pub backoff_base: Duration,
    /// Hard deadline for each individual attempt
    pub timeout: Duration,
    pub backoff: BackoffStrategy,
    /// Maximum delay to wait (caps server hints too)
    pub max_delay: Duration,
    /// Add up to 10% random delay on top of the computed backoff
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(300),
            timeout: Duration::from_secs(10),
            backoff: BackoffStrategy::Linear,
            max_delay: Duration::from_secs(30),
            jitter: false,
        }
    }
}

impl RetryPolicy {
    pub fn validate(&self) -> AppResult<()> {
        if self.max_attempts == 0 {
            return Err(AppError::config("maxAttempts must be at least 1"));
        }
        if self.timeout.is_zero() {
            return Err(AppError::config("timeoutMs must be positive"));
        }
        if let BackoffStrategy::Exponential { multiplier } = self.backoff {
            if !multiplier.is_finite() || multiplier < 1.0 {
                return Err(AppError::config("Backoff multiplier must be >= 1"));
            }
        }
        Ok(())
    }

    /// Calculate the delay after failed attempt number `attempt` (1-based)
    pub fn calculate_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        // If server provided Retry-After, respect it
        if let Some(server_delay) = retry_after {
            return server_delay.min(self.max_delay);
        }

        let attempt = attempt.max(1);
        let base_ms = self.backoff_base.as_millis() as f64;
        let delay_ms = match self.backoff {
            BackoffStrategy::Linear => base_ms * attempt as f64,
            BackoffStrategy::Exponential { multiplier } => {
                base_ms * multiplier.powi(attempt as i32 - 1)
            }
        };

        let mut delay = Duration::from_millis(delay_ms as u64);

        if self.jitter {
            let jitter_ms = (delay.as_millis() as f64 * 0.1 * rand::random::<f64>()) as u64;
            delay = delay.saturating_add(Duration::from_millis(jitter_ms));
        }

        delay.min(self.max_delay)
    }
}
