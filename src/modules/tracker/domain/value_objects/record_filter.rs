use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::modules::tracker::domain::entities::{Direction, RawRecord};
use crate::shared::errors::AppResult;
use crate::shared::utils::Validator;

/// Optional record filters, applied before de-duplication.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFilter {
    /// Lower bound on `|amount|`.
    #[serde(default)]
    pub min_amount: Option<f64>,
    /// Unix seconds, inclusive.
    #[serde(default)]
    pub since_timestamp: Option<i64>,
    #[serde(default)]
    pub direction: Option<Direction>,
    /// Case-insensitive allow-list of secondary keys.
    #[serde(default)]
    pub tokens: Option<Vec<String>>,
}

impl RecordFilter {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(min_amount) = self.min_amount {
            Validator::validate_min_amount(min_amount)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.min_amount.is_none()
            && self.since_timestamp.is_none()
            && self.direction.is_none()
            && self.tokens.as_ref().map_or(true, |t| t.is_empty())
    }

    /// Prepares the token allow-list once for a whole merge pass.
    pub fn matcher(&self) -> RecordMatcher<'_> {
        let tokens = self
            .tokens
            .as_ref()
            .map(|tokens| {
                tokens
                    .iter()
                    .map(|t| t.trim().to_lowercase())
                    .filter(|t| !t.is_empty())
                    .collect::<HashSet<_>>()
            })
            .unwrap_or_default();

        RecordMatcher {
            filter: self,
            tokens,
        }
    }
}

pub struct RecordMatcher<'a> {
    filter: &'a RecordFilter,
    tokens: HashSet<String>,
}

impl RecordMatcher<'_> {
    pub fn accepts(&self, record: &RawRecord) -> bool {
        if !self.tokens.is_empty()
            && !self
                .tokens
                .contains(&record.secondary_key.trim().to_lowercase())
        {
            return false;
        }
        if let Some(min_amount) = self.filter.min_amount {
            if record.amount.abs() < min_amount {
                return false;
            }
        }
        if let Some(since) = self.filter.since_timestamp {
            if record.timestamp < since {
                return false;
            }
        }
        if let Some(direction) = self.filter.direction {
            if record.direction != direction {
                return false;
            }
        }
        true
    }
}

/// Order of the merged record list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordOrder {
    /// Input-id order, then each entity's own record order.
    #[default]
    Input,
    /// Stable sort by timestamp, newest first.
    NewestFirst,
}
