use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use libris_core::ExternalId;

use super::types::{FileEntry, ItemDetails, RawMetadata, SearchPage};
use crate::retry::{Classify, RetryClass};

/// Content source failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("source throttled (status {status}): {message}")]
    Throttled { status: u16, message: String },

    #[error("source request failed (status {status}): {message}")]
    Remote { status: u16, message: String },

    #[error("source transport error: {0}")]
    Transport(String),

    #[error("undecodable source response: {0}")]
    Decode(String),
}

impl Classify for SourceError {
    fn classify(&self) -> RetryClass {
        match self {
            SourceError::Throttled { .. } => RetryClass::Throttled,
            _ => RetryClass::Fatal,
        }
    }
}

/// Read-only access to an external content source.
///
/// Implementations must be restartable: every `search_items` call re-queries.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// One page (1-based) of items matching `query`, in the source's order.
    async fn search_items(
        &self,
        query: &str,
        page: u32,
        rows: usize,
    ) -> Result<SearchPage, SourceError>;

    async fn get_metadata(&self, identifier: &ExternalId) -> Result<RawMetadata, SourceError>;

    async fn get_file_list(&self, identifier: &ExternalId) -> Result<Vec<FileEntry>, SourceError>;

    /// Metadata and file list together. Sources that serve both from one
    /// request should override this so each item costs one round trip.
    async fn get_item(&self, identifier: &ExternalId) -> Result<ItemDetails, SourceError> {
        Ok(ItemDetails {
            metadata: self.get_metadata(identifier).await?,
            files: self.get_file_list(identifier).await?,
        })
    }

    async fn download_file(
        &self,
        identifier: &ExternalId,
        filename: &str,
    ) -> Result<Vec<u8>, SourceError>;
}

#[async_trait]
impl<S> ContentSource for Arc<S>
where
    S: ContentSource + ?Sized,
{
    async fn search_items(
        &self,
        query: &str,
        page: u32,
        rows: usize,
    ) -> Result<SearchPage, SourceError> {
        (**self).search_items(query, page, rows).await
    }

    async fn get_metadata(&self, identifier: &ExternalId) -> Result<RawMetadata, SourceError> {
        (**self).get_metadata(identifier).await
    }

    async fn get_file_list(&self, identifier: &ExternalId) -> Result<Vec<FileEntry>, SourceError> {
        (**self).get_file_list(identifier).await
    }

    async fn get_item(&self, identifier: &ExternalId) -> Result<ItemDetails, SourceError> {
        (**self).get_item(identifier).await
    }

    async fn download_file(
        &self,
        identifier: &ExternalId,
        filename: &str,
    ) -> Result<Vec<u8>, SourceError> {
        (**self).download_file(identifier, filename).await
    }
}
