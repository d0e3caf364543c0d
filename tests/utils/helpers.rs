/// Scripted collaborators and service builders for integration tests
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use whale_radar_lib::modules::tracker::{
    EntityDataSource, EntityId, Metadata, MetadataResolver, RawRecord, RetryPolicy,
    TrackerConfig, TrackerService,
};
use whale_radar_lib::shared::errors::SourceError;

/// What the fake source does when asked for one entity
#[derive(Clone)]
pub enum Script {
    Records(Vec<RawRecord>),
    Fail(SourceError),
    /// Fails the first `failures` calls, then returns `records`
    FailThen {
        failures: u32,
        error: SourceError,
        records: Vec<RawRecord>,
    },
    /// Never answers; only a deadline or cancellation ends the call
    Hang,
    Delayed(Duration, Vec<RawRecord>),
}

struct InFlightGuard<'a> {
    in_flight: &'a AtomicUsize,
}

impl<'a> InFlightGuard<'a> {
    fn enter(in_flight: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self { in_flight }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-memory stand-in for the remote activity API
#[derive(Default)]
pub struct FakeActivitySource {
    scripts: HashMap<String, Script>,
    metadata: HashMap<String, Result<BTreeMap<String, Value>, SourceError>>,
    metadata_delays: HashMap<String, Duration>,
    fetch_calls: Mutex<HashMap<String, u32>>,
    lookups: Mutex<HashMap<String, u32>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeActivitySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, id: &str, script: Script) -> Self {
        self.scripts.insert(id.to_string(), script);
        self
    }

    pub fn with_metadata(mut self, key: &str, attributes: BTreeMap<String, Value>) -> Self {
        self.metadata.insert(key.to_string(), Ok(attributes));
        self
    }

    pub fn with_metadata_error(mut self, key: &str, error: SourceError) -> Self {
        self.metadata.insert(key.to_string(), Err(error));
        self
    }

    /// Lookups for `key` take `delay` before answering
    pub fn with_metadata_delay(mut self, key: &str, delay: Duration) -> Self {
        self.metadata_delays.insert(key.to_string(), delay);
        self
    }

    pub fn fetch_calls(&self, id: &str) -> u32 {
        self.fetch_calls
            .lock()
            .unwrap()
            .get(id)
            .copied()
            .unwrap_or(0)
    }

    pub fn lookups(&self, key: &str) -> u32 {
        self.lookups.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    pub fn total_lookups(&self) -> u32 {
        self.lookups.lock().unwrap().values().sum()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn record_call(calls: &Mutex<HashMap<String, u32>>, key: &str) -> u32 {
        let mut calls = calls.lock().unwrap();
        let count = calls.entry(key.to_string()).or_insert(0);
        *count += 1;
        *count
    }
}

#[async_trait]
impl EntityDataSource for FakeActivitySource {
    async fn fetch_entity_data(
        &self,
        id: &EntityId,
        cancel: CancellationToken,
    ) -> Result<Vec<RawRecord>, SourceError> {
        let call = Self::record_call(&self.fetch_calls, id.as_str());
        let _guard = InFlightGuard::enter(&self.in_flight, &self.peak_in_flight);

        match self.scripts.get(id.as_str()) {
            None => Err(SourceError::http(404, format!("unknown wallet {}", id))),
            Some(Script::Records(records)) => {
                tokio::task::yield_now().await;
                Ok(records.clone())
            }
            Some(Script::Fail(error)) => Err(error.clone()),
            Some(Script::FailThen {
                failures,
                error,
                records,
            }) => {
                if call <= *failures {
                    Err(error.clone())
                } else {
                    Ok(records.clone())
                }
            }
            Some(Script::Hang) => {
                cancel.cancelled().await;
                Err(SourceError::Cancelled)
            }
            Some(Script::Delayed(delay, records)) => {
                tokio::time::sleep(*delay).await;
                Ok(records.clone())
            }
        }
    }
}

#[async_trait]
impl MetadataResolver for FakeActivitySource {
    async fn resolve_metadata(
        &self,
        key: &str,
        _cancel: CancellationToken,
    ) -> Result<Metadata, SourceError> {
        Self::record_call(&self.lookups, key);
        if let Some(delay) = self.metadata_delays.get(key) {
            tokio::time::sleep(*delay).await;
        }
        match self.metadata.get(key) {
            Some(Ok(attributes)) => Ok(Metadata::resolved(key, attributes.clone())),
            Some(Err(error)) => Err(error.clone()),
            None => Ok(Metadata::resolved(key, BTreeMap::new())),
        }
    }
}

/// Short deadlines and backoff so retry paths finish quickly
pub fn fast_config() -> TrackerConfig {
    TrackerConfig {
        retry_policy: RetryPolicy {
            backoff_base: Duration::from_millis(10),
            timeout: Duration::from_millis(200),
            ..RetryPolicy::default()
        },
        ..TrackerConfig::default()
    }
}

/// Build a service whose source and resolver are both `fake`
pub fn build_service(fake: &Arc<FakeActivitySource>, config: TrackerConfig) -> TrackerService {
    TrackerService::with_default_scorer(fake.clone(), fake.clone(), config)
        .expect("default scorer is valid")
}
