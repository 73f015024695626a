//! External content source boundary (Internet Archive and test doubles).
//!
//! The ingestion pipeline only talks to [`ContentSource`]; concrete clients
//! translate their wire formats into [`RawMetadata`] and [`FileEntry`] lists.

pub mod in_memory;
pub mod internet_archive;
pub mod source;
pub mod types;

pub use in_memory::{InMemoryContentSource, SourceFixture};
pub use internet_archive::{InternetArchiveClient, InternetArchiveConfig};
pub use source::{ContentSource, SourceError};
pub use types::{CollectionQuery, FileEntry, ItemDetails, MetadataValue, RawMetadata, SearchPage, SourceItem};
