use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::shared::errors::{AppError, ClassifiedError, ErrorKind};

use super::services::score_composer::ScoreResult;

/// Opaque identifier of a wallet, token or pair tracked in one run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "IN", alias = "in")]
    In,
    #[serde(rename = "OUT", alias = "out")]
    Out,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Direction::In => f.write_str("IN"),
            Direction::Out => f.write_str("OUT"),
        }
    }
}

impl FromStr for Direction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IN" => Ok(Direction::In),
            "OUT" => Ok(Direction::Out),
            other => Err(AppError::config(format!("Unknown direction '{}'", other))),
        }
    }
}

/// One fetched datum for an entity. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    pub entity: EntityId,
    /// Token symbol or mint referenced by the record; drives enrichment.
    pub secondary_key: String,
    pub amount: f64,
    pub direction: Direction,
    /// Unix seconds.
    pub timestamp: i64,
}

/// Identity used for de-duplication. Amounts compare by bit pattern so the
/// key is hashable; `-0.0` is folded into `0.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    entity: EntityId,
    secondary_key: String,
    direction: Direction,
    amount_bits: u64,
    timestamp: i64,
}

impl RawRecord {
    pub fn new(
        entity: impl Into<EntityId>,
        secondary_key: impl Into<String>,
        amount: f64,
        direction: Direction,
        timestamp: i64,
    ) -> Self {
        Self {
            entity: entity.into(),
            secondary_key: secondary_key.into(),
            amount,
            direction,
            timestamp,
        }
    }

    pub fn dedup_key(&self) -> RecordKey {
        let amount = if self.amount == 0.0 { 0.0 } else { self.amount };
        RecordKey {
            entity: self.entity.clone(),
            secondary_key: self.secondary_key.clone(),
            direction: self.direction,
            amount_bits: amount.to_bits(),
            timestamp: self.timestamp,
        }
    }
}

/// Enrichment result for one secondary key. `error` is set when resolution
/// failed; attributes are then empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub key: String,
    pub attributes: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Metadata {
    pub fn resolved(key: impl Into<String>, attributes: BTreeMap<String, Value>) -> Self {
        Self {
            key: key.into(),
            attributes,
            error: None,
        }
    }

    pub fn failed(key: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            attributes: BTreeMap::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.error.is_none()
    }

    /// Numeric attribute; numeric strings are accepted since market APIs
    /// commonly quote prices and liquidity as strings.
    pub fn number(&self, name: &str) -> Option<f64> {
        let value: Option<f64> = match self.attributes.get(name)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        value.filter(|v| v.is_finite())
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.attributes.get(name)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.trim().parse().ok(),
            Value::Number(n) => n.as_i64().map(|v| v != 0),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorScope {
    Entity,
    Metadata,
}

/// One line of the report's error log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEntry {
    pub scope: ErrorScope,
    pub key: String,
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub attempts: u32,
}

impl ErrorEntry {
    pub fn from_classified(scope: ErrorScope, key: impl Into<String>, error: &ClassifiedError) -> Self {
        Self {
            scope,
            key: key.into(),
            kind: error.kind,
            message: error.message.clone(),
            status: error.status,
            attempts: error.attempts,
        }
    }
}

/// Output of the enrichment phase: one entry per distinct key plus the
/// error-log lines for keys that failed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataTable {
    pub entries: BTreeMap<String, Metadata>,
    pub errors: Vec<ErrorEntry>,
    /// Number of remote lookups actually issued.
    pub lookups: usize,
}

impl MetadataTable {
    pub fn get(&self, key: &str) -> Option<&Metadata> {
        self.entries.get(key)
    }

    pub fn resolved(&self) -> impl Iterator<Item = &Metadata> {
        self.entries.values().filter(|m| m.is_resolved())
    }
}

/// Aggregate root of one tracking run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub tracked_entities: usize,
    pub total_records: usize,
    pub records: Vec<RawRecord>,
    pub metadata: BTreeMap<String, Metadata>,
    pub scores: BTreeMap<String, ScoreResult>,
    pub errors: Vec<ErrorEntry>,
    pub cancelled: bool,
}

impl Report {
    pub fn error_for(&self, key: &str) -> Option<&ErrorEntry> {
        self.errors.iter().find(|e| e.key == key)
    }

    pub fn entity_errors(&self) -> impl Iterator<Item = &ErrorEntry> {
        self.errors.iter().filter(|e| e.scope == ErrorScope::Entity)
    }

    pub fn failed_entities(&self) -> usize {
        self.entity_errors().count()
    }

    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn to_json(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_direction_parsing() {
        assert_eq!("in".parse::<Direction>().unwrap(), Direction::In);
        assert_eq!(" OUT ".parse::<Direction>().unwrap(), Direction::Out);
        assert!("sideways".parse::<Direction>().is_err());
        assert_eq!(serde_json::to_value(Direction::In).unwrap(), json!("IN"));
    }

    #[test]
    fn test_dedup_key_ignores_sign_of_zero() {
        let a = RawRecord::new("A", "TOKX", 0.0, Direction::In, 10);
        let b = RawRecord::new("A", "TOKX", -0.0, Direction::In, 10);
        assert_eq!(a.dedup_key(), b.dedup_key());

        let c = RawRecord::new("A", "TOKX", 1.5, Direction::Out, 10);
        assert_ne!(a.dedup_key(), c.dedup_key());
    }

    #[test]
    fn test_metadata_accessors() {
        let mut attributes = BTreeMap::new();
        attributes.insert("liquidityUsd".to_string(), json!("1250.5"));
        attributes.insert("holders".to_string(), json!(420));
        attributes.insert("verified".to_string(), json!(true));
        attributes.insert("name".to_string(), json!("Token X"));

        let metadata = Metadata::resolved("TOKX", attributes);
        assert!(metadata.is_resolved());
        assert_eq!(metadata.number("liquidityUsd"), Some(1250.5));
        assert_eq!(metadata.number("holders"), Some(420.0));
        assert_eq!(metadata.number("name"), None);
        assert_eq!(metadata.flag("verified"), Some(true));
        assert_eq!(metadata.flag("missing"), None);

        let failed = Metadata::failed("TOKY", "HTTP 404");
        assert!(!failed.is_resolved());
        assert!(failed.attributes.is_empty());
    }
}
