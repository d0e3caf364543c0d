pub mod retry_policy;
pub mod retrying_client;

pub use retry_policy::{BackoffStrategy, RetryPolicy};
pub use retrying_client::RetryingClient;
