use serde::{Deserialize, Serialize};

use libris_core::{Book, BookSummary};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub collection: String,
    pub max_items: Option<usize>,
}

// -------------------------
// Response DTOs
// -------------------------

/// A book without its full text.
#[derive(Debug, Serialize)]
pub struct BookResponse {
    pub id: String,
    pub external_id: String,
    pub title: String,
    pub author: Option<String>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub cover_ref: Option<String>,
    pub content_length: usize,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id.to_string(),
            external_id: book.external_id.into_inner(),
            title: book.title,
            author: book.author,
            language: book.language,
            description: book.description,
            cover_ref: book.cover_ref,
            content_length: book.content.len(),
        }
    }
}

/// One entry of the book listing.
#[derive(Debug, Serialize)]
pub struct BookListItem {
    pub id: String,
    pub external_id: String,
    pub title: String,
    pub author: Option<String>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub cover_ref: Option<String>,
}

impl From<BookSummary> for BookListItem {
    fn from(book: BookSummary) -> Self {
        Self {
            id: book.id.to_string(),
            external_id: book.external_id.into_inner(),
            title: book.title,
            author: book.author,
            language: book.language,
            description: book.description,
            cover_ref: book.cover_ref,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InsightResponse {
    pub external_id: String,
    pub insight: String,
}
