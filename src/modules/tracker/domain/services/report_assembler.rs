use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::modules::tracker::domain::entities::{
    ErrorEntry, ErrorScope, Metadata, MetadataTable, Report,
};
use crate::shared::errors::{AppError, AppResult, ErrorKind};

use super::merger::MergeOutcome;
use super::score_composer::ScoreResult;

const UNRESOLVED_MESSAGE: &str = "metadata not resolved";

pub struct ReportAssembler;

impl ReportAssembler {
    /// Builds the immutable report for one run.
    ///
    /// Partial failure is not an error: a run where every entity failed still
    /// yields a report. Only a run that tracked nothing is rejected.
    pub fn assemble(
        tracked_entities: usize,
        merged: MergeOutcome,
        metadata: MetadataTable,
        scores: BTreeMap<String, ScoreResult>,
        cancelled: bool,
        generated_at: DateTime<Utc>,
    ) -> AppResult<Report> {
        if tracked_entities == 0 {
            return Err(AppError::config(
                "Cannot assemble a report without tracked entities",
            ));
        }

        let MetadataTable {
            entries: mut table,
            errors: metadata_errors,
            ..
        } = metadata;

        let mut errors = merged.errors;
        errors.extend(metadata_errors);

        // Every referenced key gets exactly one entry, even if enrichment
        // never produced one.
        for key in &merged.secondary_keys {
            if table.contains_key(key) {
                continue;
            }
            warn!("No metadata entry for '{}', inserting placeholder", key);
            table.insert(key.clone(), Metadata::failed(key.as_str(), UNRESOLVED_MESSAGE));
            errors.push(ErrorEntry {
                scope: ErrorScope::Metadata,
                key: key.clone(),
                kind: if cancelled {
                    ErrorKind::Cancelled
                } else {
                    ErrorKind::Fatal
                },
                message: UNRESOLVED_MESSAGE.to_string(),
                status: None,
                attempts: 0,
            });
        }

        let report = Report {
            run_id: Uuid::new_v4(),
            generated_at,
            tracked_entities,
            total_records: merged.records.len(),
            records: merged.records,
            metadata: table,
            scores,
            errors,
            cancelled,
        };

        info!(
            "Report {}: {} entities, {} records, {} metadata entries, {} errors{}",
            report.run_id,
            report.tracked_entities,
            report.total_records,
            report.metadata.len(),
            report.errors.len(),
            if report.cancelled { " (cancelled)" } else { "" }
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::tracker::domain::entities::{Direction, RawRecord};
    use crate::modules::tracker::domain::value_objects::ScoreBand;

    fn merged_with(records: Vec<RawRecord>, keys: &[&str], errors: Vec<ErrorEntry>) -> MergeOutcome {
        MergeOutcome {
            records,
            secondary_keys: keys.iter().map(|k| k.to_string()).collect(),
            errors,
            ..Default::default()
        }
    }

    fn entity_error(key: &str) -> ErrorEntry {
        ErrorEntry {
            scope: ErrorScope::Entity,
            key: key.to_string(),
            kind: ErrorKind::Retryable,
            message: "request timed out".to_string(),
            status: None,
            attempts: 3,
        }
    }

    #[test]
    fn test_counts_come_from_final_collections() {
        let records = vec![
            RawRecord::new("A", "TOKX", 1.0, Direction::In, 1),
            RawRecord::new("B", "TOKX", 2.0, Direction::Out, 2),
        ];
        let mut table = MetadataTable::default();
        table
            .entries
            .insert("TOKX".to_string(), Metadata::resolved("TOKX", BTreeMap::new()));

        let mut scores = BTreeMap::new();
        scores.insert(
            "TOKX".to_string(),
            ScoreResult {
                value: 42,
                label: ScoreBand::Medium,
                reasons: vec![],
                confidence: 0.7,
            },
        );

        let report = ReportAssembler::assemble(
            3,
            merged_with(records, &["TOKX"], vec![entity_error("C")]),
            table,
            scores,
            false,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(report.tracked_entities, 3);
        assert_eq!(report.total_records, 2);
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.failed_entities(), 1);
        assert_eq!(report.error_for("C").unwrap().message, "request timed out");
        assert_eq!(report.scores["TOKX"].value, 42);
        assert!(!report.cancelled);
    }

    #[test]
    fn test_all_failed_is_still_a_report() {
        let report = ReportAssembler::assemble(
            2,
            merged_with(vec![], &[], vec![entity_error("A"), entity_error("B")]),
            MetadataTable::default(),
            BTreeMap::new(),
            false,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(report.total_records, 0);
        assert_eq!(report.errors.len(), 2);
        assert!(report.is_partial());
    }

    #[test]
    fn test_zero_entities_is_a_configuration_error() {
        let err = ReportAssembler::assemble(
            0,
            MergeOutcome::default(),
            MetadataTable::default(),
            BTreeMap::new(),
            false,
            Utc::now(),
        )
        .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_missing_metadata_gets_placeholder() {
        let records = vec![RawRecord::new("A", "TOKX", 1.0, Direction::In, 1)];
        let report = ReportAssembler::assemble(
            1,
            merged_with(records, &["TOKX"], vec![]),
            MetadataTable::default(),
            BTreeMap::new(),
            true,
            Utc::now(),
        )
        .unwrap();

        let entry = &report.metadata["TOKX"];
        assert_eq!(entry.error.as_deref(), Some(UNRESOLVED_MESSAGE));
        let error = report.error_for("TOKX").unwrap();
        assert_eq!(error.scope, ErrorScope::Metadata);
        assert_eq!(error.kind, ErrorKind::Cancelled);
    }

    #[test]
    fn test_report_serializes_to_json() {
        let report = ReportAssembler::assemble(
            1,
            merged_with(
                vec![RawRecord::new("A", "TOKX", 1.0, Direction::In, 1)],
                &["TOKX"],
                vec![],
            ),
            MetadataTable::default(),
            BTreeMap::new(),
            false,
            Utc::now(),
        )
        .unwrap();

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["trackedEntities"], 1);
        assert_eq!(json["totalRecords"], 1);
        assert_eq!(json["records"][0]["secondaryKey"], "TOKX");
        assert_eq!(json["records"][0]["direction"], "IN");
        assert_eq!(json["errors"][0]["scope"], "metadata");
    }
}
