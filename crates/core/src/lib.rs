//! `libris-core`: book domain building blocks.
//!
//! This crate contains **pure domain** types (no infrastructure concerns).

pub mod book;
pub mod error;
pub mod id;

pub use book::{Book, BookSummary, NewBook};
pub use error::DomainError;
pub use id::{BookId, ExternalId};
