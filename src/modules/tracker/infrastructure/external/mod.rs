pub mod http_activity_source;

pub use http_activity_source::HttpActivitySource;
