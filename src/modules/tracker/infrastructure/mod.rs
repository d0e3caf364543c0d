pub mod dispatch;
pub mod enrichment;
pub mod external;
pub mod http_client;

pub use dispatch::{BoundedDispatcher, DispatchEvent, DispatchResults, NoopSink, ProgressSink};
pub use enrichment::MetadataEnricher;
pub use external::HttpActivitySource;
pub use http_client::{BackoffStrategy, RetryPolicy, RetryingClient};
