//! Runtime configuration for tracking runs
//!
//! Defaults:
//!
//! | variable                       | default  |
//! |--------------------------------|----------|
//! | `WHALE_RADAR_CONCURRENCY`      | 5        |
//! | `WHALE_RADAR_MAX_ATTEMPTS`     | 3        |
//! | `WHALE_RADAR_BACKOFF_BASE_MS`  | 300      |
//! | `WHALE_RADAR_BACKOFF`          | linear   |
//! | `WHALE_RADAR_TIMEOUT_MS`       | 10000    |
//! | `WHALE_RADAR_MAX_DELAY_MS`     | 30000    |
//! | `WHALE_RADAR_REQUIRE_BASE58`   | false    |
//! | `WHALE_RADAR_API_BASE_URL`     | unset    |
//! | `WHALE_RADAR_RATE_LIMIT_RPS`   | 5        |
//! | `WHALE_RADAR_MEDIUM_FROM`      | 30       |
//! | `WHALE_RADAR_HIGH_FROM`        | 70       |

use std::str::FromStr;
use std::time::Duration;

use crate::modules::tracker::domain::value_objects::LabelBands;
use crate::modules::tracker::infrastructure::dispatch::DEFAULT_CONCURRENCY;
use crate::modules::tracker::infrastructure::http_client::{BackoffStrategy, RetryPolicy};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::Validator;

const PREFIX: &str = "WHALE_RADAR_";
const DEFAULT_RATE_LIMIT_RPS: f64 = 5.0;
const EXPONENTIAL_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    pub concurrency: usize,
    pub retry_policy: RetryPolicy,
    pub require_base58: bool,
    pub api_base_url: Option<String>,
    pub rate_limit_rps: f64,
    pub bands: LabelBands,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            retry_policy: RetryPolicy::default(),
            require_base58: false,
            api_base_url: None,
            rate_limit_rps: DEFAULT_RATE_LIMIT_RPS,
            bands: LabelBands::default(),
        }
    }
}

impl TrackerConfig {
    /// Read configuration from the process environment.
    /// Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from any name -> value lookup; unset names fall
    /// back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| {
            lookup(&format!("{}{}", PREFIX, name))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let backoff = match get("BACKOFF").as_deref().map(str::to_ascii_lowercase) {
            None => defaults.retry_policy.backoff,
            Some(name) if name == "linear" => BackoffStrategy::Linear,
            Some(name) if name == "exponential" => BackoffStrategy::Exponential {
                multiplier: EXPONENTIAL_MULTIPLIER,
            },
            Some(other) => {
                return Err(AppError::config(format!(
                    "{}BACKOFF must be 'linear' or 'exponential', got '{}'",
                    PREFIX, other
                )))
            }
        };

        let retry_policy = RetryPolicy {
            max_attempts: parse_or(get("MAX_ATTEMPTS"), "MAX_ATTEMPTS", defaults.retry_policy.max_attempts)?,
            backoff_base: millis_or(get("BACKOFF_BASE_MS"), "BACKOFF_BASE_MS", defaults.retry_policy.backoff_base)?,
            timeout: millis_or(get("TIMEOUT_MS"), "TIMEOUT_MS", defaults.retry_policy.timeout)?,
            backoff,
            max_delay: millis_or(get("MAX_DELAY_MS"), "MAX_DELAY_MS", defaults.retry_policy.max_delay)?,
            jitter: defaults.retry_policy.jitter,
        };

        let bands = LabelBands {
            medium_from: parse_or(get("MEDIUM_FROM"), "MEDIUM_FROM", defaults.bands.medium_from)?,
            high_from: parse_or(get("HIGH_FROM"), "HIGH_FROM", defaults.bands.high_from)?,
        };

        let config = Self {
            concurrency: parse_or(get("CONCURRENCY"), "CONCURRENCY", defaults.concurrency)?,
            retry_policy,
            require_base58: bool_or(get("REQUIRE_BASE58"), "REQUIRE_BASE58", defaults.require_base58)?,
            api_base_url: get("API_BASE_URL"),
            rate_limit_rps: parse_or(get("RATE_LIMIT_RPS"), "RATE_LIMIT_RPS", defaults.rate_limit_rps)?,
            bands,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        Validator::validate_concurrency(self.concurrency)?;
        self.retry_policy.validate()?;
        self.bands.validate()?;
        if !self.rate_limit_rps.is_finite() || self.rate_limit_rps <= 0.0 {
            return Err(AppError::config(format!(
                "{}RATE_LIMIT_RPS must be a positive number",
                PREFIX
            )));
        }
        Ok(())
    }

    /// Base URL for the HTTP adapter; required by the binary only
    pub fn require_api_base_url(&self) -> AppResult<&str> {
        self.api_base_url.as_deref().ok_or_else(|| {
            AppError::config(format!(
                "{}API_BASE_URL environment variable not found",
                PREFIX
            ))
        })
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, name: &str, default: T) -> AppResult<T> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| {
            AppError::config(format!("Invalid value '{}' for {}{}", value, PREFIX, name))
        }),
    }
}

fn millis_or(raw: Option<String>, name: &str, default: Duration) -> AppResult<Duration> {
    let millis = parse_or(raw, name, default.as_millis() as u64)?;
    Ok(Duration::from_millis(millis))
}

fn bool_or(raw: Option<String>, name: &str, default: bool) -> AppResult<bool> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("true" | "1" | "yes" | "on") => Ok(true),
        Some("false" | "0" | "no" | "off") => Ok(false),
        Some(other) => Err(AppError::config(format!(
            "Invalid boolean '{}' for {}{}",
            other, PREFIX, name
        ))),
    }
}
