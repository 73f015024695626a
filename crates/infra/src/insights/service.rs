//! On-demand insight generation with memoization and single-flight.
//!
//! Lookup order: memo, then (for a miss) one shared in-flight generation per
//! book. The generator call goes through the backoff executor. Only
//! successful, non-blank texts are memoized.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use libris_ai::{GenerationError, InsightPrompt, TextGenerator};
use libris_core::ExternalId;

use super::store::InsightStore;
use crate::retry::{BackoffExecutor, RetryPolicy};
use crate::store::{BookReader, StoreError};

/// Why an insight could not be returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsightError {
    #[error("book not found: {0}")]
    NotFound(ExternalId),

    #[error("insight generation failed: {0}")]
    GenerationFailed(GenerationError),

    #[error("generator returned no text for {0}")]
    EmptyResult(ExternalId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl InsightError {
    /// "Try again later" rather than "does not exist".
    pub fn is_retryable(&self) -> bool {
        !matches!(self, InsightError::NotFound(_))
    }

    /// Generation gave up while still throttled.
    pub fn is_throttled(&self) -> bool {
        matches!(self, InsightError::GenerationFailed(e) if e.is_throttled())
    }
}

type Flight = Arc<OnceCell<Result<String, InsightError>>>;

/// One caller's membership in a flight.
///
/// Dropping it, whether the call finished or its future was abandoned,
/// unregisters the flight once it has landed or no other caller is waiting.
struct FlightGuard<'a> {
    inflight: &'a Mutex<HashMap<ExternalId, Flight>>,
    external_id: &'a ExternalId,
    flight: Flight,
}

impl std::ops::Deref for FlightGuard<'_> {
    type Target = OnceCell<Result<String, InsightError>>;

    fn deref(&self) -> &Self::Target {
        &self.flight
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let Ok(mut inflight) = self.inflight.lock() else {
            return;
        };
        // The table holds one reference and this guard another.
        let ours = inflight.get(self.external_id).is_some_and(|f| {
            Arc::ptr_eq(f, &self.flight) && (f.initialized() || Arc::strong_count(f) <= 2)
        });
        if ours {
            inflight.remove(self.external_id);
        }
    }
}

/// Insight generation cache.
pub struct InsightService {
    books: Arc<dyn BookReader>,
    generator: Arc<dyn TextGenerator>,
    insights: Arc<dyn InsightStore>,
    executor: BackoffExecutor,
    words: u32,
    inflight: Mutex<HashMap<ExternalId, Flight>>,
}

impl std::fmt::Debug for InsightService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsightService")
            .field("executor", &self.executor)
            .field("words", &self.words)
            .finish_non_exhaustive()
    }
}

impl InsightService {
    pub fn new(
        books: impl BookReader + 'static,
        generator: impl TextGenerator,
        insights: impl InsightStore + 'static,
    ) -> Self {
        Self {
            books: Arc::new(books),
            generator: Arc::new(generator),
            insights: Arc::new(insights),
            executor: BackoffExecutor::default(),
            words: 300,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.executor = BackoffExecutor::new(policy);
        self
    }

    /// Target length of generated insights, in words.
    pub fn with_words(mut self, words: u32) -> Self {
        self.words = words;
        self
    }

    /// Memoized insight for `external_id`, generating it on a miss.
    ///
    /// Concurrent callers for the same uncached book share one generation and
    /// all receive its result, failures included. Failures are not memoized:
    /// the next call after a failed flight starts over.
    pub async fn get_or_generate(&self, external_id: &ExternalId) -> Result<String, InsightError> {
        if let Some(text) = self.insights.get(external_id).await? {
            debug!(external_id = %external_id, "insight memo hit");
            return Ok(text);
        }

        let flight = self.join_flight(external_id)?;
        flight
            .get_or_init(|| self.generate(external_id))
            .await
            .clone()
    }

    /// Drop every memoized insight.
    pub async fn clear(&self) -> Result<(), InsightError> {
        self.insights.clear().await?;
        Ok(())
    }

    fn join_flight<'a>(&'a self, external_id: &'a ExternalId) -> Result<FlightGuard<'a>, InsightError> {
        let mut inflight = self
            .inflight
            .lock()
            .map_err(|_| StoreError::storage("in-flight table lock poisoned"))?;
        let flight = inflight.entry(external_id.clone()).or_default().clone();
        Ok(FlightGuard {
            inflight: &self.inflight,
            external_id,
            flight,
        })
    }

    #[instrument(skip(self, external_id), fields(external_id = %external_id))]
    async fn generate(&self, external_id: &ExternalId) -> Result<String, InsightError> {
        // A flight that just landed may have filled the memo.
        if let Some(text) = self.insights.get(external_id).await? {
            return Ok(text);
        }

        let book = self
            .books
            .find_by_external_id(external_id)
            .await?
            .ok_or_else(|| InsightError::NotFound(external_id.clone()))?;

        let prompt = InsightPrompt::for_book(&book).with_words(self.words).render();
        let text = self
            .executor
            .execute(|| self.generator.generate(&prompt))
            .await
            .map_err(InsightError::GenerationFailed)?
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| InsightError::EmptyResult(external_id.clone()))?;

        self.insights.put(external_id.clone(), text.clone()).await?;
        info!(chars = text.len(), "insight generated");
        Ok(text)
    }
}
