//! Book persistence boundary.
//!
//! The store behaves like a database session: `insert` writes into an open
//! unit of work that only becomes visible to readers after `commit`.
//! `rollback` discards everything written since the last commit.

pub mod in_memory;
pub mod mysql;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use libris_core::{Book, BookSummary, ExternalId, NewBook};

pub use in_memory::InMemoryBookStore;
pub use mysql::MySqlBookStore;

/// Store operation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("book already exists: {0}")]
    Duplicate(ExternalId),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("no open unit of work")]
    NoTransaction,
}

impl StoreError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

/// Read access to committed books.
#[async_trait]
pub trait BookReader: Send + Sync {
    async fn find_by_external_id(&self, external_id: &ExternalId) -> Result<Option<Book>, StoreError>;

    /// Every committed book without its text, oldest first.
    async fn list(&self) -> Result<Vec<BookSummary>, StoreError>;
}

/// Transactional book store.
#[async_trait]
pub trait BookStore: BookReader {
    /// Write `book` into the open unit of work (opened on first insert).
    async fn insert(&self, book: NewBook) -> Result<Book, StoreError>;

    /// Make the open unit of work durable. Returns how many books it held.
    async fn commit(&self) -> Result<usize, StoreError>;

    /// Discard the open unit of work.
    async fn rollback(&self) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> BookReader for Arc<S>
where
    S: BookReader + ?Sized,
{
    async fn find_by_external_id(&self, external_id: &ExternalId) -> Result<Option<Book>, StoreError> {
        (**self).find_by_external_id(external_id).await
    }

    async fn list(&self) -> Result<Vec<BookSummary>, StoreError> {
        (**self).list().await
    }
}

#[async_trait]
impl<S> BookStore for Arc<S>
where
    S: BookStore + ?Sized,
{
    async fn insert(&self, book: NewBook) -> Result<Book, StoreError> {
        (**self).insert(book).await
    }

    async fn commit(&self) -> Result<usize, StoreError> {
        (**self).commit().await
    }

    async fn rollback(&self) -> Result<(), StoreError> {
        (**self).rollback().await
    }
}
