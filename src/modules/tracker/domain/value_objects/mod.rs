pub mod record_filter;
pub mod score_band;

pub use record_filter::{RecordFilter, RecordMatcher, RecordOrder};
pub use score_band::{LabelBands, ScoreBand};
