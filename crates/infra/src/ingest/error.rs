use thiserror::Error;

use libris_core::ExternalId;

use crate::archive::SourceError;
use crate::store::StoreError;

/// Failure of a single item. Never aborts the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    #[error("no .txt content file for {0}")]
    ContentNotFound(ExternalId),

    #[error("content of {0} is not valid UTF-8")]
    InvalidContent(ExternalId),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
