use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use libris_core::ExternalId;

use super::source::{ContentSource, SourceError};
use super::types::{CollectionQuery, FileEntry, MetadataValue, RawMetadata, SearchPage, SourceItem};

/// One item of an in-memory source: metadata plus named files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFixture {
    pub identifier: ExternalId,
    pub metadata: RawMetadata,
    /// Fields reported alongside the identifier in search results.
    pub listing: RawMetadata,
    pub files: Vec<(String, Vec<u8>)>,
}

impl SourceFixture {
    /// A fixture whose metadata carries its own identifier.
    pub fn new(identifier: impl Into<ExternalId>) -> Self {
        let identifier = identifier.into();
        let metadata = RawMetadata::new().with("identifier", identifier.as_str());
        Self {
            identifier,
            metadata,
            listing: RawMetadata::new(),
            files: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key, value);
        self
    }

    pub fn with_listing(mut self, key: &str, value: impl Into<MetadataValue>) -> Self {
        self.listing.insert(key, value);
        self
    }

    pub fn with_file(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.files.push((name.into(), bytes.into()));
        self
    }

    /// Adds `{identifier}.txt` with `text` as content.
    pub fn with_text(self, text: &str) -> Self {
        let name = format!("{}.txt", self.identifier);
        self.with_file(name, text.as_bytes())
    }
}

/// In-memory content source for tests/dev.
///
/// Unknown identifiers behave like the Internet Archive: empty metadata and
/// an empty file list.
#[derive(Debug, Default)]
pub struct InMemoryContentSource {
    collections: RwLock<HashMap<String, Vec<ExternalId>>>,
    items: RwLock<HashMap<ExternalId, SourceFixture>>,
    failures: RwLock<HashMap<ExternalId, SourceError>>,
    searches: AtomicUsize,
    downloads: AtomicUsize,
    throttled_calls: AtomicUsize,
}

fn poisoned() -> SourceError {
    SourceError::Transport("lock poisoned".to_string())
}

impl InMemoryContentSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `fixture` to `collection` (query order = insertion order).
    pub fn insert(&self, collection: &str, fixture: SourceFixture) -> Result<(), SourceError> {
        let query = CollectionQuery::new(collection).to_string();
        self.collections
            .write()
            .map_err(|_| poisoned())?
            .entry(query)
            .or_default()
            .push(fixture.identifier.clone());
        self.items
            .write()
            .map_err(|_| poisoned())?
            .insert(fixture.identifier.clone(), fixture);
        Ok(())
    }

    /// Make every metadata/file-list/download call for `identifier` fail with `error`.
    pub fn fail_item(&self, identifier: impl Into<ExternalId>, error: SourceError) -> Result<(), SourceError> {
        self.failures
            .write()
            .map_err(|_| poisoned())?
            .insert(identifier.into(), error);
        Ok(())
    }

    /// Answer the next `n` calls (of any kind) with HTTP 429.
    pub fn throttle_next(&self, n: usize) {
        self.throttled_calls.store(n, Ordering::SeqCst);
    }

    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    fn check_throttle(&self) -> Result<(), SourceError> {
        let throttled = self
            .throttled_calls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match throttled {
            Ok(_) => Err(SourceError::Throttled {
                status: 429,
                message: "slow down".to_string(),
            }),
            Err(_) => Ok(()),
        }
    }

    fn check_failure(&self, identifier: &ExternalId) -> Result<(), SourceError> {
        self.check_throttle()?;
        match self.failures.read().map_err(|_| poisoned())?.get(identifier) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn fixture(&self, identifier: &ExternalId) -> Result<Option<SourceFixture>, SourceError> {
        self.check_failure(identifier)?;
        Ok(self.items.read().map_err(|_| poisoned())?.get(identifier).cloned())
    }
}

#[async_trait]
impl ContentSource for InMemoryContentSource {
    async fn search_items(
        &self,
        query: &str,
        page: u32,
        rows: usize,
    ) -> Result<SearchPage, SourceError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.check_throttle()?;

        let collections = self.collections.read().map_err(|_| poisoned())?;
        let fixtures = self.items.read().map_err(|_| poisoned())?;
        let ids = collections.get(query).map(Vec::as_slice).unwrap_or_default();

        let start = (page.max(1) as usize - 1).saturating_mul(rows);
        let items = ids
            .iter()
            .skip(start)
            .take(rows)
            .map(|id| {
                let listing = fixtures.get(id).map(|f| f.listing.clone()).unwrap_or_default();
                SourceItem::new(id.clone()).with_metadata(listing)
            })
            .collect();

        Ok(SearchPage {
            items,
            total: Some(ids.len()),
        })
    }

    async fn get_metadata(&self, identifier: &ExternalId) -> Result<RawMetadata, SourceError> {
        Ok(self
            .fixture(identifier)?
            .map(|f| f.metadata)
            .unwrap_or_default())
    }

    async fn get_file_list(&self, identifier: &ExternalId) -> Result<Vec<FileEntry>, SourceError> {
        Ok(self
            .fixture(identifier)?
            .map(|f| f.files.into_iter().map(|(name, _)| FileEntry::new(name)).collect())
            .unwrap_or_default())
    }

    async fn download_file(
        &self,
        identifier: &ExternalId,
        filename: &str,
    ) -> Result<Vec<u8>, SourceError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);

        self.fixture(identifier)?
            .and_then(|f| f.files.into_iter().find(|(name, _)| name == filename))
            .map(|(_, bytes)| bytes)
            .ok_or_else(|| SourceError::Remote {
                status: 404,
                message: format!("{identifier}/{filename} not found"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pages_follow_insertion_order() {
        let source = InMemoryContentSource::new();
        for id in ["a", "b", "c"] {
            source.insert("demo", SourceFixture::new(id)).unwrap();
        }
        let query = CollectionQuery::new("demo").to_string();

        let first = source.search_items(&query, 1, 2).await.unwrap();
        let second = source.search_items(&query, 2, 2).await.unwrap();
        let third = source.search_items(&query, 3, 2).await.unwrap();

        let ids = |p: &SearchPage| p.items.iter().map(|i| i.identifier.to_string()).collect::<Vec<_>>();
        assert_eq!(ids(&first), vec!["a", "b"]);
        assert_eq!(ids(&second), vec!["c"]);
        assert!(third.items.is_empty());
        assert_eq!(first.total, Some(3));
    }

    #[tokio::test]
    async fn search_results_carry_listing_fields() {
        let source = InMemoryContentSource::new();
        source
            .insert("demo", SourceFixture::new("a").with_listing("title", "Listed"))
            .unwrap();
        let query = CollectionQuery::new("demo").to_string();

        let page = source.search_items(&query, 1, 10).await.unwrap();

        assert_eq!(page.items[0].metadata.get("title").and_then(MetadataValue::first), Some("Listed"));
    }

    #[tokio::test]
    async fn default_item_details_combine_metadata_and_files() {
        let source = InMemoryContentSource::new();
        source
            .insert("demo", SourceFixture::new("x").with_metadata("title", "X").with_text("hello"))
            .unwrap();

        let details = source.get_item(&ExternalId::new("x")).await.unwrap();

        assert_eq!(details.metadata.get("title").and_then(MetadataValue::first), Some("X"));
        assert_eq!(details.files, vec![FileEntry::new("x.txt")]);
    }

    #[tokio::test]
    async fn unknown_query_is_empty() {
        let source = InMemoryContentSource::new();
        let page = source.search_items("collection:(nope) AND mediatype:(texts)", 1, 10).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, Some(0));
    }

    #[tokio::test]
    async fn injected_failures_apply_to_item_calls() {
        let source = InMemoryContentSource::new();
        source.insert("demo", SourceFixture::new("x").with_text("hello")).unwrap();
        source
            .fail_item("x", SourceError::Transport("boom".to_string()))
            .unwrap();

        let id = ExternalId::new("x");
        assert!(source.get_metadata(&id).await.is_err());
        assert!(source.download_file(&id, "x.txt").await.is_err());
    }

    #[tokio::test]
    async fn download_missing_file_is_not_found() {
        let source = InMemoryContentSource::new();
        source.insert("demo", SourceFixture::new("x")).unwrap();

        let err = source
            .download_file(&ExternalId::new("x"), "x.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Remote { status: 404, .. }));
        assert_eq!(source.download_count(), 1);
    }

    #[tokio::test]
    async fn throttle_applies_to_the_next_calls_only() {
        let source = InMemoryContentSource::new();
        source.insert("demo", SourceFixture::new("x")).unwrap();
        source.throttle_next(1);

        let id = ExternalId::new("x");
        assert!(matches!(
            source.get_metadata(&id).await,
            Err(SourceError::Throttled { status: 429, .. })
        ));
        assert!(source.get_metadata(&id).await.is_ok());
    }
}
