//! Service wiring: one content source, one book store, one insight cache.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use libris_ai::TextGenerator;
use libris_infra::archive::ContentSource;
use libris_infra::ingest::{ImportConfig, ImportPipeline, ImportSummary};
use libris_infra::insights::{InMemoryInsightStore, InsightService};
use libris_infra::retry::RetryPolicy;
use libris_infra::store::{BookStore, InMemoryBookStore};

pub type SharedSource = Arc<dyn ContentSource>;
pub type SharedStore = Arc<dyn BookStore>;

/// Everything the handlers need.
pub struct AppServices {
    books: SharedStore,
    insights: InsightService,
    importer: ImportPipeline<SharedSource, SharedStore>,
    /// The store has a single unit of work; imports run one at a time.
    import_lock: Mutex<()>,
    retry_after: Duration,
}

impl AppServices {
    pub fn new(
        source: SharedSource,
        books: SharedStore,
        generator: impl TextGenerator,
        import: ImportConfig,
        insight_words: u32,
    ) -> Self {
        let insights = InsightService::new(books.clone(), generator, InMemoryInsightStore::new())
            .with_retry(import.retry.clone())
            .with_words(insight_words);
        let retry_after = retry_after_hint(&import.retry);

        Self {
            importer: ImportPipeline::new(source, books.clone(), import),
            books,
            insights,
            import_lock: Mutex::new(()),
            retry_after,
        }
    }

    /// In-memory store, default import settings. For tests and local runs.
    pub fn in_memory(source: SharedSource, generator: impl TextGenerator) -> Self {
        Self::new(
            source,
            Arc::new(InMemoryBookStore::new()),
            generator,
            ImportConfig::default(),
            300,
        )
    }

    pub fn books(&self) -> &SharedStore {
        &self.books
    }

    pub fn insights(&self) -> &InsightService {
        &self.insights
    }

    /// Seconds a throttled client should wait before asking again.
    pub fn retry_after(&self) -> Duration {
        self.retry_after
    }

    pub async fn import(&self, collection: &str, max_items: Option<usize>) -> ImportSummary {
        let _guard = self.import_lock.lock().await;
        self.importer.import_collection(collection, max_items).await
    }
}

/// The longest single backoff sleep of `policy`, at least one second.
fn retry_after_hint(policy: &RetryPolicy) -> Duration {
    policy
        .delay_for_attempt(policy.max_attempts.saturating_sub(1).max(1))
        .max(Duration::from_secs(1))
}
