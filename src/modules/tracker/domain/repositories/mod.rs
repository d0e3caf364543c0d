mod activity_source;

pub use activity_source::*;
