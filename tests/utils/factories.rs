/// Test data factories using builder pattern
///
/// Provides convenient methods to create records and token metadata with
/// sensible defaults
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use whale_radar_lib::modules::tracker::{Direction, EntityId, RawRecord};

pub const DEFAULT_TIMESTAMP: i64 = 1_700_000_000;

pub struct RecordFactory {
    entity: EntityId,
    token: String,
    amount: f64,
    direction: Direction,
    timestamp: i64,
}

impl RecordFactory {
    pub fn new(entity: &str) -> Self {
        Self {
            entity: EntityId::from(entity),
            token: "TOKX".to_string(),
            amount: 1_000.0,
            direction: Direction::In,
            timestamp: DEFAULT_TIMESTAMP,
        }
    }

    pub fn token(mut self, token: &str) -> Self {
        self.token = token.to_string();
        self
    }

    pub fn amount(mut self, amount: f64) -> Self {
        self.amount = amount;
        self
    }

    pub fn outgoing(mut self) -> Self {
        self.direction = Direction::Out;
        self
    }

    pub fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn build(self) -> RawRecord {
        RawRecord::new(
            self.entity,
            self.token,
            self.amount,
            self.direction,
            self.timestamp,
        )
    }
}

#[derive(Default)]
pub struct MetadataFactory {
    attributes: BTreeMap<String, Value>,
}

impl MetadataFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A well-established token: deep liquidity, many holders, verified
    pub fn established() -> Self {
        Self::new()
            .liquidity(50_000.0)
            .holders(5_000)
            .verified(true)
            .created_at(DateTime::from_timestamp(1_600_000_000, 0).unwrap_or_default())
    }

    pub fn liquidity(mut self, usd: f64) -> Self {
        self.attributes.insert("liquidity_usd".to_string(), json!(usd));
        self
    }

    pub fn holders(mut self, holders: u64) -> Self {
        self.attributes.insert("holders".to_string(), json!(holders));
        self
    }

    pub fn verified(mut self, verified: bool) -> Self {
        self.attributes.insert("verified".to_string(), json!(verified));
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.attributes
            .insert("created_at".to_string(), json!(at.timestamp()));
        self
    }

    pub fn build(self) -> BTreeMap<String, Value> {
        self.attributes
    }
}
