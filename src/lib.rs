pub mod modules;
pub mod shared;

pub use modules::tracker::{
    HttpActivitySource, Report, TrackRequest, TrackerConfig, TrackerService,
};
pub use shared::errors::{AppError, AppResult};
