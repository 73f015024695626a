//! MySQL / TiDB backed book store.
//!
//! Schema: a single `books` table keyed by a UUID string, with `ia_id`
//! (the external identifier) unique.
//!
//! `insert` opens a transaction on first use and keeps it until `commit` or
//! `rollback`. The open transaction lives behind a `tokio::sync::Mutex`, so
//! one unit of work is in flight per store at a time.
//!
//! ## Error Mapping
//!
//! | sqlx error | MySQL code | StoreError |
//! |---|---|---|
//! | Database, duplicate key | `1062` | `Duplicate` |
//! | anything else | | `Storage` |

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{MySql, Row, Transaction};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use libris_core::{Book, BookId, BookSummary, ExternalId, NewBook};

use super::{BookReader, BookStore, StoreError};

const CREATE_BOOKS: &str = r#"
CREATE TABLE IF NOT EXISTS books (
    id CHAR(36) NOT NULL PRIMARY KEY,
    ia_id VARCHAR(255) NOT NULL,
    title VARCHAR(512) NOT NULL,
    author VARCHAR(512) NULL,
    language VARCHAR(64) NULL,
    description TEXT NULL,
    cover_image_url VARCHAR(1024) NULL,
    content LONGTEXT NOT NULL,
    UNIQUE KEY uq_books_ia_id (ia_id)
)
"#;

struct UnitOfWork {
    tx: Transaction<'static, MySql>,
    staged: usize,
}

/// sqlx-backed book store.
pub struct MySqlBookStore {
    pool: MySqlPool,
    open: Mutex<Option<UnitOfWork>>,
}

impl std::fmt::Debug for MySqlBookStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlBookStore").finish_non_exhaustive()
    }
}

impl MySqlBookStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self {
            pool,
            open: Mutex::new(None),
        }
    }

    /// Connect with a small pool. The pipeline is single-worker.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the `books` table if missing.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_BOOKS)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

#[async_trait]
impl BookReader for MySqlBookStore {
    #[instrument(skip(self, external_id), fields(external_id = %external_id), err)]
    async fn find_by_external_id(&self, external_id: &ExternalId) -> Result<Option<Book>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, ia_id, title, author, language, description, cover_image_url, content
            FROM books
            WHERE ia_id = ?
            "#,
        )
        .bind(external_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_external_id", e))?;

        row.map(|r| book_from_row(&r)).transpose()
    }

    /// UUIDv7 ids sort by creation time.
    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<BookSummary>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, ia_id, title, author, language, description, cover_image_url
            FROM books
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list", e))?;

        rows.iter().map(summary_from_row).collect()
    }
}

#[async_trait]
impl BookStore for MySqlBookStore {
    async fn insert(&self, book: NewBook) -> Result<Book, StoreError> {
        let mut open = self.open.lock().await;
        if open.is_none() {
            let tx = self
                .pool
                .begin()
                .await
                .map_err(|e| map_sqlx_error("begin", e))?;
            *open = Some(UnitOfWork { tx, staged: 0 });
        }
        let Some(unit) = open.as_mut() else {
            return Err(StoreError::NoTransaction);
        };

        let book = book.into_book(BookId::new());
        sqlx::query(
            r#"
            INSERT INTO books (id, ia_id, title, author, language, description, cover_image_url, content)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(book.id.to_string())
        .bind(book.external_id.as_str())
        .bind(&book.title)
        .bind(book.author.as_deref())
        .bind(book.language.as_deref())
        .bind(book.description.as_deref())
        .bind(book.cover_ref.as_deref())
        .bind(&book.content)
        .execute(&mut *unit.tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate(book.external_id.clone())
            } else {
                map_sqlx_error("insert", e)
            }
        })?;

        unit.staged += 1;
        Ok(book)
    }

    #[instrument(skip(self), err)]
    async fn commit(&self) -> Result<usize, StoreError> {
        let Some(unit) = self.open.lock().await.take() else {
            return Ok(0);
        };
        let staged = unit.staged;
        unit.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        debug!(staged, "committed books");
        Ok(staged)
    }

    #[instrument(skip(self), err)]
    async fn rollback(&self) -> Result<(), StoreError> {
        let Some(unit) = self.open.lock().await.take() else {
            return Ok(());
        };
        unit.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

fn summary_from_row(row: &MySqlRow) -> Result<BookSummary, StoreError> {
    let get = |e: sqlx::Error| map_sqlx_error("decode", e);

    let id: String = row.try_get("id").map_err(get)?;
    let id = BookId::from_str(&id).map_err(|e| StoreError::storage(format!("bad book id {id}: {e}")))?;
    let external_id: String = row.try_get("ia_id").map_err(get)?;

    Ok(BookSummary {
        id,
        external_id: ExternalId::new(external_id),
        title: row.try_get("title").map_err(get)?,
        author: row.try_get("author").map_err(get)?,
        language: row.try_get("language").map_err(get)?,
        description: row.try_get("description").map_err(get)?,
        cover_ref: row.try_get("cover_image_url").map_err(get)?,
    })
}

fn book_from_row(row: &MySqlRow) -> Result<Book, StoreError> {
    let summary = summary_from_row(row)?;
    let content: String = row
        .try_get("content")
        .map_err(|e| map_sqlx_error("decode", e))?;

    Ok(Book {
        id: summary.id,
        external_id: summary.external_id,
        title: summary.title,
        author: summary.author,
        language: summary.language,
        description: summary.description,
        cover_ref: summary.cover_ref,
        content,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            StoreError::storage(format!("database error in {operation}: {}", db_err.message()))
        }
        sqlx::Error::PoolClosed => StoreError::storage(format!("connection pool closed in {operation}")),
        other => StoreError::storage(format!("sqlx error in {operation}: {other}")),
    }
}

/// Duplicate key (MySQL error 1062).
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}
