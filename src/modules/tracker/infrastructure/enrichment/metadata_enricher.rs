use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::modules::tracker::domain::entities::{ErrorEntry, ErrorScope, Metadata, MetadataTable};
use crate::modules::tracker::domain::repositories::MetadataResolver;
use crate::modules::tracker::infrastructure::dispatch::{BoundedDispatcher, ProgressSink};
use crate::modules::tracker::infrastructure::http_client::RetryingClient;

/// Resolves metadata for every distinct secondary key referenced by the
/// merged records.
///
/// Each key is looked up exactly once per run, however many records mention
/// it. A failed lookup never drops records; it yields an error-tagged entry
/// and a metadata-scope line in the error log.
pub struct MetadataEnricher {
    resolver: Arc<dyn MetadataResolver>,
    client: RetryingClient,
    dispatcher: BoundedDispatcher,
}

impl MetadataEnricher {
    pub fn new(
        resolver: Arc<dyn MetadataResolver>,
        client: RetryingClient,
        dispatcher: BoundedDispatcher,
    ) -> Self {
        Self {
            resolver,
            client,
            dispatcher,
        }
    }

    pub async fn enrich(
        &self,
        keys: &[String],
        cancel: &CancellationToken,
        sink: &dyn ProgressSink,
    ) -> MetadataTable {
        let mut seen = HashSet::new();
        let distinct: Vec<String> = keys
            .iter()
            .filter(|key| seen.insert(key.as_str()))
            .cloned()
            .collect();

        if distinct.is_empty() {
            return MetadataTable::default();
        }
        debug!(
            "Enriching {} distinct keys ({} references)",
            distinct.len(),
            keys.len()
        );

        let lookups = AtomicUsize::new(0);
        let results = self
            .dispatcher
            .dispatch_all("metadata", &distinct, cancel, sink, |key: String| {
                lookups.fetch_add(1, Ordering::Relaxed);
                let resolver = self.resolver.clone();
                async move {
                    let operation = format!("metadata lookup {}", key);
                    self.client
                        .call(&operation, cancel, |token| resolver.resolve_metadata(&key, token))
                        .await
                }
            })
            .await;

        let mut table = MetadataTable {
            lookups: lookups.into_inner(),
            ..MetadataTable::default()
        };

        for (key, outcome) in results.into_entries() {
            let entry = match outcome {
                Ok(mut metadata) => {
                    metadata.key = key.clone();
                    metadata
                }
                Err(error) => {
                    if !error.is_cancelled() {
                        warn!("Metadata for '{}' unavailable: {}", key, error);
                    }
                    table
                        .errors
                        .push(ErrorEntry::from_classified(ErrorScope::Metadata, key.as_str(), &error));
                    Metadata::failed(key.as_str(), error.message)
                }
            };
            table.entries.insert(key, entry);
        }

        table
    }
}
