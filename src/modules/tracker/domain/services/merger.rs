use std::collections::HashSet;
use tracing::debug;

use crate::modules::tracker::domain::entities::{EntityId, ErrorEntry, ErrorScope, RawRecord};
use crate::modules::tracker::domain::value_objects::{RecordFilter, RecordOrder};
use crate::shared::errors::ClassifiedError;

/// Flattened, filtered and de-duplicated view of one fetch phase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    pub records: Vec<RawRecord>,
    /// Distinct secondary keys in first-appearance order.
    pub secondary_keys: Vec<String>,
    /// Fetch failures, in input-id order.
    pub errors: Vec<ErrorEntry>,
    pub filtered_out: usize,
    pub duplicates_dropped: usize,
}

/// Merges per-entity fetch results into one ordered record list
pub struct RecordMerger;

impl RecordMerger {
    /// `per_entity` must already be in the caller's input-id order. Filters
    /// run before de-duplication so rejected records never influence which
    /// duplicate survives or which keys get enriched.
    pub fn merge<I>(per_entity: I, filter: &RecordFilter, order: RecordOrder) -> MergeOutcome
    where
        I: IntoIterator<Item = (EntityId, Result<Vec<RawRecord>, ClassifiedError>)>,
    {
        let matcher = filter.matcher();
        let mut outcome = MergeOutcome::default();
        let mut seen = HashSet::new();
        let mut seen_keys = HashSet::new();

        for (id, result) in per_entity {
            let records = match result {
                Ok(records) => records,
                Err(error) => {
                    outcome
                        .errors
                        .push(ErrorEntry::from_classified(ErrorScope::Entity, id.as_str(), &error));
                    continue;
                }
            };

            for record in records {
                if !matcher.accepts(&record) {
                    outcome.filtered_out += 1;
                    continue;
                }
                if !seen.insert(record.dedup_key()) {
                    outcome.duplicates_dropped += 1;
                    continue;
                }
                if seen_keys.insert(record.secondary_key.clone()) {
                    outcome.secondary_keys.push(record.secondary_key.clone());
                }
                outcome.records.push(record);
            }
        }

        if order == RecordOrder::NewestFirst {
            outcome.records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        }

        debug!(
            "Merged {} records ({} filtered, {} duplicates, {} keys, {} failed entities)",
            outcome.records.len(),
            outcome.filtered_out,
            outcome.duplicates_dropped,
            outcome.secondary_keys.len(),
            outcome.errors.len()
        );

        outcome
    }
}
