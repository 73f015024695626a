//! Bulk import of one collection.
//!
//! Items are processed sequentially in query order. Staged books are written
//! and committed every `batch_size` items; a failed batch is rolled back and
//! counted, and the run moves on.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use libris_core::{ExternalId, NewBook};

use super::content::select_text_file;
use super::error::ItemError;
use super::normalize::normalize;
use crate::archive::{CollectionQuery, ContentSource, FileEntry, SearchPage, SourceError, SourceItem};
use crate::retry::{BackoffExecutor, RetryError, RetryPolicy};
use crate::store::{BookStore, StoreError};

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportConfig {
    /// Staged books per commit.
    pub batch_size: usize,
    /// Rows requested per search page.
    pub page_size: usize,
    /// Retry policy for every source call.
    pub retry: RetryPolicy,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            page_size: 100,
            retry: RetryPolicy::default(),
        }
    }
}

/// What happened to one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Normalized and staged for the next commit.
    Inserted(ExternalId),
    /// Already stored, or already staged in this run.
    Skipped(ExternalId),
    Failed(ExternalId, ItemError),
}

/// Result of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub collection: String,
    /// Books durably committed.
    pub processed: usize,
    /// Duplicates.
    pub skipped: usize,
    /// Per-item failures plus books lost to failed batch commits.
    pub failed: usize,
    pub batches_committed: usize,
    pub batches_failed: usize,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ImportSummary {
    fn started(collection: &str) -> Self {
        let now = Utc::now();
        Self {
            collection: collection.to_string(),
            processed: 0,
            skipped: 0,
            failed: 0,
            batches_committed: 0,
            batches_failed: 0,
            cancelled: false,
            started_at: now,
            finished_at: now,
        }
    }
}

/// Books staged since the last flush.
#[derive(Debug, Default)]
struct Batch {
    books: Vec<NewBook>,
    ids: HashSet<ExternalId>,
}

impl Batch {
    fn contains(&self, id: &ExternalId) -> bool {
        self.ids.contains(id)
    }

    fn push(&mut self, book: NewBook) {
        self.ids.insert(book.external_id.clone());
        self.books.push(book);
    }

    fn len(&self) -> usize {
        self.books.len()
    }

    fn take(&mut self) -> Vec<NewBook> {
        self.ids.clear();
        std::mem::take(&mut self.books)
    }
}

/// Why an item stopped before being staged.
enum Halt {
    Failed(ItemError),
    Cancelled,
}

impl From<ItemError> for Halt {
    fn from(err: ItemError) -> Self {
        Halt::Failed(err)
    }
}

impl From<StoreError> for Halt {
    fn from(err: StoreError) -> Self {
        Halt::Failed(ItemError::Store(err))
    }
}

impl From<RetryError<SourceError>> for Halt {
    fn from(err: RetryError<SourceError>) -> Self {
        match err {
            RetryError::Call(e) => Halt::Failed(ItemError::Source(e)),
            RetryError::Cancelled { .. } => Halt::Cancelled,
        }
    }
}

/// Imports a source collection into a book store.
#[derive(Debug)]
pub struct ImportPipeline<S, B> {
    source: S,
    store: B,
    executor: BackoffExecutor,
    config: ImportConfig,
}

impl<S, B> ImportPipeline<S, B>
where
    S: ContentSource,
    B: BookStore,
{
    pub fn new(source: S, store: B, config: ImportConfig) -> Self {
        Self {
            source,
            store,
            executor: BackoffExecutor::new(config.retry.clone()),
            config,
        }
    }

    /// Import up to `max_items` query results of `collection`.
    pub async fn import_collection(&self, collection: &str, max_items: Option<usize>) -> ImportSummary {
        self.import_collection_cancellable(collection, max_items, &CancellationToken::new())
            .await
    }

    /// Like [`import_collection`](Self::import_collection), stopping at the
    /// next item or retry boundary once `cancel` fires. Whatever was staged
    /// before that is still flushed.
    #[instrument(skip(self, collection, cancel), fields(collection = %collection))]
    pub async fn import_collection_cancellable(
        &self,
        collection: &str,
        max_items: Option<usize>,
        cancel: &CancellationToken,
    ) -> ImportSummary {
        let query = CollectionQuery::new(collection).to_string();
        let rows = self.config.page_size.max(1);
        let batch_size = self.config.batch_size.max(1);
        let limit = max_items.unwrap_or(usize::MAX);

        let mut summary = ImportSummary::started(collection);
        let mut batch = Batch::default();
        let mut seen = 0usize;
        let mut page_no = 1u32;

        info!(query = %query, max_items = ?max_items, "import started");

        'pages: while seen < limit {
            let page = match self.search_page(&query, page_no, rows, cancel).await {
                Ok(page) => page,
                Err(RetryError::Cancelled { .. }) => {
                    summary.cancelled = true;
                    break;
                }
                Err(RetryError::Call(e)) => {
                    error!(page = page_no, error = %e, "collection query failed; ending run");
                    break;
                }
            };
            if page.items.is_empty() {
                break;
            }

            for item in page.items {
                if seen >= limit {
                    break 'pages;
                }
                if cancel.is_cancelled() {
                    summary.cancelled = true;
                    break 'pages;
                }
                seen += 1;

                let Some(outcome) = self.process_item(item, &mut batch, cancel).await else {
                    summary.cancelled = true;
                    break 'pages;
                };
                match outcome {
                    ItemOutcome::Inserted(_) => {}
                    ItemOutcome::Skipped(id) => {
                        debug!(external_id = %id, "already imported; skipping");
                        summary.skipped += 1;
                    }
                    ItemOutcome::Failed(id, err) => {
                        warn!(external_id = %id, error = %err, "item failed");
                        summary.failed += 1;
                    }
                }

                if batch.len() >= batch_size {
                    self.flush(&mut batch, &mut summary).await;
                }
            }

            if page.total.is_some_and(|total| (page_no as usize).saturating_mul(rows) >= total) {
                break;
            }
            page_no += 1;
        }

        self.flush(&mut batch, &mut summary).await;
        summary.finished_at = Utc::now();

        if summary.cancelled {
            info!("import cancelled");
        }
        info!(
            processed = summary.processed,
            skipped = summary.skipped,
            failed = summary.failed,
            batches_committed = summary.batches_committed,
            batches_failed = summary.batches_failed,
            "import finished"
        );
        summary
    }

    async fn search_page(
        &self,
        query: &str,
        page: u32,
        rows: usize,
        cancel: &CancellationToken,
    ) -> Result<SearchPage, RetryError<SourceError>> {
        self.executor
            .execute_cancellable(cancel, || self.source.search_items(query, page, rows))
            .await
    }

    /// `None` when cancelled before the item could be staged.
    async fn process_item(
        &self,
        item: SourceItem,
        batch: &mut Batch,
        cancel: &CancellationToken,
    ) -> Option<ItemOutcome> {
        let id = item.identifier.clone();
        match self.stage(item, batch, cancel).await {
            Ok(outcome) => Some(outcome),
            Err(Halt::Failed(err)) => Some(ItemOutcome::Failed(id, err)),
            Err(Halt::Cancelled) => None,
        }
    }

    async fn stage(
        &self,
        item: SourceItem,
        batch: &mut Batch,
        cancel: &CancellationToken,
    ) -> Result<ItemOutcome, Halt> {
        let id = item.identifier;
        if self.is_duplicate(&id, batch).await? {
            return Ok(ItemOutcome::Skipped(id));
        }

        let details = self
            .executor
            .execute_cancellable(cancel, || self.source.get_item(&id))
            .await?;
        let mut metadata = details.metadata;
        metadata.insert_missing("identifier", id.as_str());
        metadata.merge_missing(item.metadata);

        let content = match item.content {
            Some(content) => content,
            None => self.fetch_content(&id, &details.files, cancel).await?,
        };

        let book = normalize(&metadata, content);
        if book.external_id != id && self.is_duplicate(&book.external_id, batch).await? {
            return Ok(ItemOutcome::Skipped(book.external_id));
        }

        let staged = book.external_id.clone();
        batch.push(book);
        Ok(ItemOutcome::Inserted(staged))
    }

    async fn is_duplicate(&self, id: &ExternalId, batch: &Batch) -> Result<bool, StoreError> {
        if batch.contains(id) {
            return Ok(true);
        }
        Ok(self.store.find_by_external_id(id).await?.is_some())
    }

    async fn fetch_content(
        &self,
        id: &ExternalId,
        files: &[FileEntry],
        cancel: &CancellationToken,
    ) -> Result<String, Halt> {
        let file = select_text_file(id, files).ok_or_else(|| ItemError::ContentNotFound(id.clone()))?;

        let bytes = self
            .executor
            .execute_cancellable(cancel, || self.source.download_file(id, &file.name))
            .await?;
        String::from_utf8(bytes).map_err(|_| Halt::Failed(ItemError::InvalidContent(id.clone())))
    }

    /// Write and commit everything staged. Never interrupted by cancellation.
    async fn flush(&self, batch: &mut Batch, summary: &mut ImportSummary) {
        let books = batch.take();
        if books.is_empty() {
            return;
        }
        let size = books.len();

        match self.write_batch(books).await {
            Ok(_) => {
                summary.processed += size;
                summary.batches_committed += 1;
                info!(batch_size = size, total = summary.processed, "batch committed");
            }
            Err(e) => {
                error!(batch_size = size, error = %e, "batch commit failed; rolling back");
                if let Err(rollback) = self.store.rollback().await {
                    error!(error = %rollback, "rollback failed");
                }
                summary.failed += size;
                summary.batches_failed += 1;
            }
        }
    }

    async fn write_batch(&self, books: Vec<NewBook>) -> Result<usize, StoreError> {
        for book in books {
            self.store.insert(book).await?;
        }
        self.store.commit().await
    }
}
