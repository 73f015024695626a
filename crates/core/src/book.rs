//! The book entity: what the ingestion pipeline stores and insights are built from.

use serde::{Deserialize, Serialize};

use crate::id::{BookId, ExternalId};

/// A normalized book that has not been persisted yet.
///
/// Produced by the metadata normalizer and staged by the ingestion pipeline.
/// `author` is already flattened to a single string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    pub external_id: ExternalId,
    pub title: String,
    pub author: Option<String>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub cover_ref: Option<String>,
    /// Full text. Never truncated.
    pub content: String,
}

impl NewBook {
    /// Assign a storage identity.
    pub fn into_book(self, id: BookId) -> Book {
        Book {
            id,
            external_id: self.external_id,
            title: self.title,
            author: self.author,
            language: self.language,
            description: self.description,
            cover_ref: self.cover_ref,
            content: self.content,
        }
    }
}

/// A persisted book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub external_id: ExternalId,
    pub title: String,
    pub author: Option<String>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub cover_ref: Option<String>,
    pub content: String,
}

/// A book without its full text, as returned by listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSummary {
    pub id: BookId,
    pub external_id: ExternalId,
    pub title: String,
    pub author: Option<String>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub cover_ref: Option<String>,
}

impl From<Book> for BookSummary {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            external_id: book.external_id,
            title: book.title,
            author: book.author,
            language: book.language,
            description: book.description,
            cover_ref: book.cover_ref,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn into_book_keeps_every_field() {
        let new = NewBook {
            external_id: ExternalId::new("dune-1965"),
            title: "Dune".to_string(),
            author: Some("Frank Herbert".to_string()),
            language: Some("eng".to_string()),
            description: None,
            cover_ref: Some("IA1234".to_string()),
            content: "A beginning is the time...".to_string(),
        };

        let id = BookId::new();
        let book = new.clone().into_book(id);

        assert_eq!(book.id, id);
        assert_eq!(book.external_id, new.external_id);
        assert_eq!(book.title, new.title);
        assert_eq!(book.author, new.author);
        assert_eq!(book.cover_ref, new.cover_ref);
        assert_eq!(book.content, new.content);
    }
}
