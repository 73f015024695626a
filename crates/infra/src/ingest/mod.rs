//! Ingestion pipeline: bulk import of a source collection into the book store.

pub mod content;
pub mod error;
pub mod normalize;
pub mod pipeline;

pub use content::select_text_file;
pub use error::ItemError;
pub use normalize::normalize;
pub use pipeline::{ImportConfig, ImportPipeline, ImportSummary, ItemOutcome};
