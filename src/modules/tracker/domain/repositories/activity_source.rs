use crate::modules::tracker::domain::entities::{EntityId, Metadata, RawRecord};
use crate::shared::errors::SourceError;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Repository interface for fetching per-entity activity from a remote source
///
/// Implementations perform exactly one attempt per call. Timeouts, retries and
/// classification are applied by the caller, so an implementation only has to
/// map its transport failures onto `SourceError` and stop work once `cancel`
/// fires.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntityDataSource: Send + Sync {
    /// Fetch the raw records for one entity
    ///
    /// # Returns
    /// Records in the source's own order; that order is preserved in the report
    async fn fetch_entity_data(
        &self,
        id: &EntityId,
        cancel: CancellationToken,
    ) -> Result<Vec<RawRecord>, SourceError>;
}

/// Repository interface for resolving secondary-key metadata
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    /// Resolve the attributes for one secondary key (token symbol or mint)
    async fn resolve_metadata(
        &self,
        key: &str,
        cancel: CancellationToken,
    ) -> Result<Metadata, SourceError>;
}
