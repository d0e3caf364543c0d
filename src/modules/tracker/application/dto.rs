use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::modules::tracker::config::TrackerConfig;
use crate::modules::tracker::domain::entities::EntityId;
use crate::modules::tracker::domain::value_objects::{RecordFilter, RecordOrder};
use crate::modules::tracker::infrastructure::http_client::RetryPolicy;
use crate::shared::errors::AppResult;
use crate::shared::utils::Validator;

/// Per-request overrides on top of the configured retry policy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicyOverrides {
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub backoff_base_ms: Option<u64>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl RetryPolicyOverrides {
    pub fn apply(&self, base: &RetryPolicy) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.unwrap_or(base.max_attempts),
            backoff_base: self
                .backoff_base_ms
                .map(Duration::from_millis)
                .unwrap_or(base.backoff_base),
            timeout: self.timeout_ms.map(Duration::from_millis).unwrap_or(base.timeout),
            ..base.clone()
        }
    }
}

/// Inbound request for one tracking run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRequest {
    pub entity_ids: Vec<String>,
    #[serde(default)]
    pub filters: Option<RecordFilter>,
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub retry_policy: Option<RetryPolicyOverrides>,
    #[serde(default)]
    pub order: RecordOrder,
}

/// A request that passed validation, with config defaults filled in
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub ids: Vec<EntityId>,
    pub filter: RecordFilter,
    pub concurrency: usize,
    pub retry_policy: RetryPolicy,
    pub order: RecordOrder,
}

impl TrackRequest {
    pub fn new<I, S>(entity_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entity_ids: entity_ids.into_iter().map(Into::into).collect(),
            filters: None,
            concurrency: None,
            retry_policy: None,
            order: RecordOrder::default(),
        }
    }

    pub fn with_filters(mut self, filters: RecordFilter) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    pub fn with_retry_policy(mut self, overrides: RetryPolicyOverrides) -> Self {
        self.retry_policy = Some(overrides);
        self
    }

    pub fn with_order(mut self, order: RecordOrder) -> Self {
        self.order = order;
        self
    }

    pub fn from_json(json: &str) -> AppResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Synchronous checks that must pass before any remote call is made.
    ///
    /// Zero concurrency is rejected; values above the dispatcher maximum are
    /// clamped there.
    pub fn validate(&self, config: &TrackerConfig) -> AppResult<ValidatedRequest> {
        Validator::validate_entity_ids(&self.entity_ids, config.require_base58)?;

        let concurrency = self.concurrency.unwrap_or(config.concurrency);
        Validator::validate_concurrency(concurrency)?;

        let filter = self.filters.clone().unwrap_or_default();
        filter.validate()?;

        let retry_policy = match &self.retry_policy {
            Some(overrides) => overrides.apply(&config.retry_policy),
            None => config.retry_policy.clone(),
        };
        retry_policy.validate()?;

        Ok(ValidatedRequest {
            ids: self.entity_ids.iter().map(|id| EntityId::new(id.as_str())).collect(),
            filter,
            concurrency,
            retry_policy,
            order: self.order,
        })
    }
}
