pub mod entities;
pub mod repositories;
pub mod services;
pub mod value_objects;

pub use entities::{
    Direction, EntityId, ErrorEntry, ErrorScope, Metadata, MetadataTable, RawRecord, Report,
};
pub use repositories::{EntityDataSource, MetadataResolver};
pub use value_objects::{LabelBands, RecordFilter, RecordOrder, ScoreBand};
