pub mod dto;
pub mod service;

pub use dto::{RetryPolicyOverrides, TrackRequest, ValidatedRequest};
pub use service::TrackerService;
