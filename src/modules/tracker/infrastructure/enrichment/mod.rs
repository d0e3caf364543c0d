pub mod metadata_enricher;

pub use metadata_enricher::MetadataEnricher;
