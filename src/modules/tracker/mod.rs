pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-exports for easy external access
pub use application::{RetryPolicyOverrides, TrackRequest, TrackerService};
pub use config::TrackerConfig;
pub use domain::{
    Direction, EntityDataSource, EntityId, ErrorEntry, ErrorScope, Metadata, MetadataResolver,
    RawRecord, RecordFilter, RecordOrder, Report, ScoreBand,
};
pub use domain::services::{RiskScorer, ScoreComposer, ScoreResult, WeightTable};
pub use infrastructure::{
    BoundedDispatcher, DispatchEvent, HttpActivitySource, MetadataEnricher, NoopSink,
    ProgressSink, RetryPolicy, RetryingClient,
};
