use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use libris_core::{Book, BookId, BookSummary, ExternalId, NewBook};

use super::{BookReader, BookStore, StoreError};

#[derive(Debug, Default)]
struct State {
    committed: HashMap<ExternalId, Book>,
    /// Insertion order of committed books.
    order: Vec<ExternalId>,
    pending: Vec<Book>,
    /// Size of every successful commit, in order.
    commits: Vec<usize>,
}

/// In-memory book store.
///
/// Intended for tests/dev. Readers only see committed books. Commit failures
/// can be injected with [`fail_next_commits`](Self::fail_next_commits).
#[derive(Debug, Default)]
pub struct InMemoryBookStore {
    state: RwLock<State>,
    failing_commits: AtomicUsize,
}

fn poisoned() -> StoreError {
    StoreError::storage("lock poisoned")
}

impl InMemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store already-committed books (fixtures).
    pub fn with_books(books: impl IntoIterator<Item = NewBook>) -> Self {
        let store = Self::new();
        if let Ok(mut state) = store.state.write() {
            for book in books {
                let book = book.into_book(BookId::new());
                state.order.push(book.external_id.clone());
                state.committed.insert(book.external_id.clone(), book);
            }
        }
        store
    }

    /// Make the next `n` commits fail (the unit of work stays open until rolled back).
    pub fn fail_next_commits(&self, n: usize) {
        self.failing_commits.store(n, Ordering::SeqCst);
    }

    /// Sizes of all successful commits so far.
    pub fn commit_sizes(&self) -> Vec<usize> {
        self.state.read().map(|s| s.commits.clone()).unwrap_or_default()
    }

    /// Committed books in commit order.
    pub fn books(&self) -> Vec<Book> {
        self.state
            .read()
            .map(|s| s.order.iter().filter_map(|id| s.committed.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, external_id: &str) -> bool {
        self.state
            .read()
            .map(|s| s.committed.contains_key(&ExternalId::new(external_id)))
            .unwrap_or(false)
    }

    pub fn pending_len(&self) -> usize {
        self.state.read().map(|s| s.pending.len()).unwrap_or(0)
    }
}

#[async_trait]
impl BookReader for InMemoryBookStore {
    async fn find_by_external_id(&self, external_id: &ExternalId) -> Result<Option<Book>, StoreError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.committed.get(external_id).cloned())
    }

    async fn list(&self) -> Result<Vec<BookSummary>, StoreError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state
            .order
            .iter()
            .filter_map(|id| state.committed.get(id).cloned())
            .map(BookSummary::from)
            .collect())
    }
}

#[async_trait]
impl BookStore for InMemoryBookStore {
    async fn insert(&self, book: NewBook) -> Result<Book, StoreError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;

        let duplicate = state.committed.contains_key(&book.external_id)
            || state.pending.iter().any(|b| b.external_id == book.external_id);
        if duplicate {
            return Err(StoreError::Duplicate(book.external_id));
        }

        let book = book.into_book(BookId::new());
        state.pending.push(book.clone());
        Ok(book)
    }

    async fn commit(&self) -> Result<usize, StoreError> {
        let failing = self
            .failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(StoreError::storage("injected commit failure"));
        }

        let mut state = self.state.write().map_err(|_| poisoned())?;
        let pending = std::mem::take(&mut state.pending);
        let count = pending.len();
        for book in pending {
            state.order.push(book.external_id.clone());
            state.committed.insert(book.external_id.clone(), book);
        }
        state.commits.push(count);
        Ok(count)
    }

    async fn rollback(&self) -> Result<(), StoreError> {
        self.state.write().map_err(|_| poisoned())?.pending.clear();
        Ok(())
    }
}
