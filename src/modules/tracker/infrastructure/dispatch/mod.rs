pub mod bounded_dispatcher;
pub mod progress;

pub use bounded_dispatcher::{BoundedDispatcher, DispatchResults, DEFAULT_CONCURRENCY, MAX_CONCURRENCY};
pub use progress::{DispatchEvent, DispatchStatus, NoopSink, ProgressSink};
