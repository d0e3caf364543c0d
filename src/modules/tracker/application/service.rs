use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::dto::TrackRequest;
use crate::modules::tracker::config::TrackerConfig;
use crate::modules::tracker::domain::entities::{EntityId, MetadataTable, Report};
use crate::modules::tracker::domain::repositories::{EntityDataSource, MetadataResolver};
use crate::modules::tracker::domain::services::{
    FeatureExtractor, RecordMerger, ReportAssembler, RiskScorer, ScoreComposer, ScoreResult,
    WeightTable,
};
use crate::modules::tracker::infrastructure::dispatch::{BoundedDispatcher, NoopSink, ProgressSink};
use crate::modules::tracker::infrastructure::enrichment::MetadataEnricher;
use crate::modules::tracker::infrastructure::http_client::RetryingClient;
use crate::shared::errors::AppResult;
use crate::shared::utils::TimedOperation;

/// Runs fetch -> merge -> enrich -> score -> assemble for one request.
///
/// Only configuration problems fail a run. Entity and metadata failures end
/// up in the report's error list and the run still produces a report.
pub struct TrackerService {
    source: Arc<dyn EntityDataSource>,
    resolver: Arc<dyn MetadataResolver>,
    scorer: Arc<dyn RiskScorer>,
    config: TrackerConfig,
}

impl TrackerService {
    pub fn new(
        source: Arc<dyn EntityDataSource>,
        resolver: Arc<dyn MetadataResolver>,
        scorer: Arc<dyn RiskScorer>,
        config: TrackerConfig,
    ) -> Self {
        Self {
            source,
            resolver,
            scorer,
            config,
        }
    }

    /// Default weight table with the configured label bands
    pub fn with_default_scorer(
        source: Arc<dyn EntityDataSource>,
        resolver: Arc<dyn MetadataResolver>,
        config: TrackerConfig,
    ) -> AppResult<Self> {
        let scorer = ScoreComposer::new(WeightTable::default().with_bands(config.bands))?;
        Ok(Self::new(source, resolver, Arc::new(scorer), config))
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub async fn track(&self, request: &TrackRequest, cancel: &CancellationToken) -> AppResult<Report> {
        self.track_with_progress(request, cancel, &NoopSink).await
    }

    pub async fn track_with_progress(
        &self,
        request: &TrackRequest,
        cancel: &CancellationToken,
        sink: &dyn ProgressSink,
    ) -> AppResult<Report> {
        let validated = request.validate(&self.config)?;
        let timer = TimedOperation::new("track");

        let client = RetryingClient::new(validated.retry_policy.clone())?;
        let dispatcher = BoundedDispatcher::new(validated.concurrency)?;
        info!(
            "Tracking {} entities (concurrency {}, {} attempts per call)",
            validated.ids.len(),
            dispatcher.concurrency(),
            client.policy().max_attempts
        );

        let fetched = {
            let client = &client;
            dispatcher
                .dispatch_all("fetch", &validated.ids, cancel, sink, |id: EntityId| {
                    let source = self.source.clone();
                    async move {
                        let operation = format!("fetch {}", id);
                        client
                            .call(&operation, cancel, |token| source.fetch_entity_data(&id, token))
                            .await
                    }
                })
                .await
        };
        let mut cancelled = fetched.cancelled();

        let merged = RecordMerger::merge(fetched.into_entries(), &validated.filter, validated.order);
        debug!(
            "Merged {} records ({} filtered out, {} duplicates dropped, {} distinct keys)",
            merged.records.len(),
            merged.filtered_out,
            merged.duplicates_dropped,
            merged.secondary_keys.len()
        );

        let metadata = if cancelled || cancel.is_cancelled() {
            MetadataTable::default()
        } else {
            MetadataEnricher::new(self.resolver.clone(), client, dispatcher)
                .enrich(&merged.secondary_keys, cancel, sink)
                .await
        };
        cancelled |= cancel.is_cancelled();

        let now = Utc::now();
        let scores: BTreeMap<String, ScoreResult> = metadata
            .resolved()
            .map(|entry| {
                let features = FeatureExtractor::extract(&entry.key, &merged.records, entry, now);
                (entry.key.clone(), self.scorer.score(&features))
            })
            .collect();

        let report = ReportAssembler::assemble(
            validated.ids.len(),
            merged,
            metadata,
            scores,
            cancelled,
            now,
        )?;

        timer.finish_with_info(&format!(
            "{} records, {} errors",
            report.total_records,
            report.errors.len()
        ));
        Ok(report)
    }
}
