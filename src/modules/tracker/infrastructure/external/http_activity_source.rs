//! REST adapter for wallet transfers and token metadata
//!
//! Every request waits on a shared governor limiter before it is sent. One
//! call is one attempt: deadlines and retries belong to `RetryingClient`.

use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    middleware::NoOpMiddleware,
    state::{direct::NotKeyed, InMemoryState},
    Quota, RateLimiter as GovernorRateLimiter,
};
use reqwest::{header::HeaderMap, Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroU32;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::modules::tracker::domain::entities::{Direction, EntityId, Metadata, RawRecord};
use crate::modules::tracker::domain::repositories::{EntityDataSource, MetadataResolver};
use crate::shared::errors::{AppError, AppResult, SourceError};
use crate::shared::utils::LogContext;

type DirectRateLimiter = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

const SOURCE_NAME: &str = "WhaleRadar";
const USER_AGENT: &str = concat!("whale-radar/", env!("CARGO_PKG_VERSION"));
const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Deserialize)]
struct TransfersResponse {
    transfers: Vec<TransferDto>,
}

/// Amounts and timestamps arrive as numbers or numeric strings
#[derive(Debug, Deserialize)]
struct TransferDto {
    token: String,
    amount: Value,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    to: Option<String>,
    timestamp: Value,
}

impl TransferDto {
    fn into_record(self, wallet: &EntityId) -> Result<RawRecord, SourceError> {
        let amount = number_field(&self.amount)
            .ok_or_else(|| SourceError::Malformed(format!("invalid amount {}", self.amount)))?;
        let timestamp = number_field(&self.timestamp)
            .filter(|t| *t >= 0.0)
            .ok_or_else(|| SourceError::Malformed(format!("invalid timestamp {}", self.timestamp)))?
            as i64;

        let direction = if self.to.as_deref() == Some(wallet.as_str()) {
            Direction::In
        } else {
            Direction::Out
        };
        if self.from.is_none() && self.to.is_none() {
            tracing::debug!("Transfer of {} for {} has no counterparties", self.token, wallet);
        }

        Ok(RawRecord::new(wallet.clone(), self.token, amount, direction, timestamp))
    }
}

fn number_field(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

/// Seconds from a `Retry-After` header; HTTP-date values are ignored
fn retry_after_from_headers(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get("retry-after")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn truncate(body: &str) -> String {
    if body.chars().count() > MAX_ERROR_BODY {
        let head: String = body.chars().take(MAX_ERROR_BODY).collect();
        format!("{}...", head)
    } else {
        body.to_string()
    }
}

pub struct HttpActivitySource {
    client: Client,
    base_url: String,
    rate_limiter: DirectRateLimiter,
}

impl fmt::Debug for HttpActivitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpActivitySource")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpActivitySource {
    pub fn new(base_url: &str, requests_per_second: f64) -> AppResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(AppError::config(format!(
                "API base URL must start with http:// or https://, got '{}'",
                base_url
            )));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            rate_limiter: Self::create_rate_limiter(requests_per_second)?,
        })
    }

    /// Burst equals one second worth of requests
    fn create_rate_limiter(requests_per_second: f64) -> AppResult<DirectRateLimiter> {
        if !requests_per_second.is_finite() || requests_per_second <= 0.0 {
            return Err(AppError::config("Rate limit must be a positive number"));
        }

        let period = Duration::try_from_secs_f64(1.0 / requests_per_second).map_err(|_| {
            AppError::config(format!(
                "Rate limit of {} requests per second is out of range",
                requests_per_second
            ))
        })?;
        let burst = NonZeroU32::new((requests_per_second.ceil() as u32).max(1))
            .ok_or_else(|| AppError::config("Rate limit burst must be positive"))?;
        let quota = Quota::with_period(period)
            .ok_or_else(|| AppError::config("Rate limit period must be positive"))?
            .allow_burst(burst);

        Ok(GovernorRateLimiter::direct(quota))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if a request can be made now without waiting
    pub fn can_make_request_now(&self) -> bool {
        self.rate_limiter.check().is_ok()
    }

    fn transfers_url(&self, id: &EntityId) -> String {
        format!(
            "{}/wallets/{}/transfers",
            self.base_url,
            urlencoding::encode(id.as_str())
        )
    }

    fn token_url(&self, key: &str) -> String {
        format!("{}/tokens/{}", self.base_url, urlencoding::encode(key))
    }

    async fn get_json(&self, url: &str, cancel: &CancellationToken) -> Result<Value, SourceError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SourceError::Cancelled),
            result = self.send(url) => result,
        }
    }

    async fn send(&self, url: &str) -> Result<Value, SourceError> {
        self.rate_limiter.until_ready().await;

        LogContext::api_call(SOURCE_NAME, url, "", None);
        let started = Instant::now();

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let retry_after = retry_after_from_headers(response.headers());
            let body = response.text().await.unwrap_or_default();
            LogContext::api_call(
                SOURCE_NAME,
                url,
                status.as_str(),
                Some(started.elapsed().as_millis() as u64),
            );
            return Err(SourceError::Http {
                status: status.as_u16(),
                message: Self::error_message(status, &body),
                retry_after,
            });
        }

        let text = response.text().await?;
        LogContext::api_call(
            SOURCE_NAME,
            url,
            status.as_str(),
            Some(started.elapsed().as_millis() as u64),
        );

        let body: Value = serde_json::from_str(&text)
            .map_err(|e| SourceError::Malformed(format!("{}: {}", e, truncate(&text))))?;
        Self::check_payload(body)
    }

    fn error_message(status: StatusCode, body: &str) -> String {
        let reason = status.canonical_reason().unwrap_or("error");
        let body = body.trim();
        if body.is_empty() {
            reason.to_string()
        } else {
            format!("{}: {}", reason, truncate(body))
        }
    }

    /// Bodies must be JSON objects and must not carry an `error` field
    fn check_payload(body: Value) -> Result<Value, SourceError> {
        match &body {
            Value::Object(map) => {
                if let Some(error) = map.get("error") {
                    let message = match error {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    return Err(SourceError::Validation(format!(
                        "response contains an error field: {}",
                        message
                    )));
                }
                Ok(body)
            }
            other => Err(SourceError::Validation(format!(
                "expected a JSON object, got {}",
                truncate(&other.to_string())
            ))),
        }
    }
}

#[async_trait]
impl EntityDataSource for HttpActivitySource {
    async fn fetch_entity_data(
        &self,
        id: &EntityId,
        cancel: CancellationToken,
    ) -> Result<Vec<RawRecord>, SourceError> {
        let body = self.get_json(&self.transfers_url(id), &cancel).await?;
        let response: TransfersResponse = serde_json::from_value(body)?;

        response
            .transfers
            .into_iter()
            .map(|transfer| transfer.into_record(id))
            .collect()
    }
}

#[async_trait]
impl MetadataResolver for HttpActivitySource {
    async fn resolve_metadata(
        &self,
        key: &str,
        cancel: CancellationToken,
    ) -> Result<Metadata, SourceError> {
        let body = self.get_json(&self.token_url(key), &cancel).await?;
        let attributes: BTreeMap<String, Value> = match body {
            Value::Object(map) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        };
        Ok(Metadata::resolved(key, attributes))
    }
}
