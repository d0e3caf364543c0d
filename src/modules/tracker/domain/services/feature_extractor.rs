use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::modules::tracker::domain::entities::{Direction, Metadata, RawRecord};

use super::score_composer::ScoredFeatureSet;

/// A token younger than this counts as recently created.
pub const RECENT_CREATION_HOURS: f64 = 24.0 * 7.0;

const LIQUIDITY_ATTRS: &[&str] = &["liquidity_usd", "liquidityUsd", "liquidity"];
const HOLDER_ATTRS: &[&str] = &["holders", "holderCount", "holder_count"];
const VERIFIED_ATTRS: &[&str] = &["verified", "isVerified"];
const CREATED_ATTRS: &[&str] = &["created_at", "createdAt", "pairCreatedAt"];

/// Builds score inputs for one secondary key from merged records and its
/// metadata. The clock is an explicit argument so scoring stays reproducible.
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn extract(
        key: &str,
        records: &[RawRecord],
        metadata: &Metadata,
        now: DateTime<Utc>,
    ) -> ScoredFeatureSet {
        let mut features = ScoredFeatureSet::new();

        let related: Vec<&RawRecord> = records.iter().filter(|r| r.secondary_key == key).collect();
        let inflows = related.iter().filter(|r| r.direction == Direction::In).count();
        let entities: HashSet<_> = related.iter().map(|r| &r.entity).collect();
        let volume: f64 = related.iter().map(|r| r.amount.abs()).sum();

        features = features
            .with_value("tx_count", related.len() as f64)
            .with_value("volume", volume)
            .with_value("inflow_count", inflows as f64)
            .with_value("outflow_count", (related.len() - inflows) as f64)
            .with_value("unique_entities", entities.len() as f64);

        if let Some(liquidity) = first_number(metadata, LIQUIDITY_ATTRS) {
            features = features.with_value("liquidity_usd", liquidity);
        }
        if let Some(holders) = first_number(metadata, HOLDER_ATTRS) {
            features = features.with_value("holders", holders);
        }
        if let Some(verified) = VERIFIED_ATTRS.iter().find_map(|name| metadata.flag(name)) {
            features = features.with_flag("verified", verified);
        }
        if let Some(age_hours) = CREATED_ATTRS
            .iter()
            .find_map(|name| created_seconds(metadata, name))
            .and_then(|created| age_in_hours(created, now))
        {
            features = features
                .with_value("age_hours", age_hours)
                .with_flag("recently_created", age_hours < RECENT_CREATION_HOURS);
        }

        features
    }
}

fn first_number(metadata: &Metadata, names: &[&str]) -> Option<f64> {
    names.iter().find_map(|name| metadata.number(name))
}

/// Creation times arrive as unix seconds, unix milliseconds or RFC 3339
/// strings. Numbers past 1e12 are read as milliseconds.
fn created_seconds(metadata: &Metadata, name: &str) -> Option<f64> {
    if let Some(created) = metadata.number(name) {
        if created <= 0.0 {
            return None;
        }
        return Some(if created > 1e12 { created / 1000.0 } else { created });
    }
    let raw = metadata.attributes.get(name)?.as_str()?;
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|created| created.timestamp() as f64)
}

/// Future timestamps clamp to age zero.
fn age_in_hours(created_secs: f64, now: DateTime<Utc>) -> Option<f64> {
    let age_secs = now.timestamp() as f64 - created_secs;
    Some((age_secs / 3600.0).max(0.0))
}
