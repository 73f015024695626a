//! `libris-ai`
//!
//! **Responsibility:** text-generation boundary.
//!
//! This crate is intentionally storage-agnostic:
//! - It knows how to phrase a prompt for a book and how to call a generation API.
//! - It does not retry, cache or persist. Those concerns live in `libris-infra`.
//! - Failures are classified so callers can tell throttling from hard errors.

pub mod error;
pub mod gemini;
pub mod generator;
pub mod prompt;

pub use error::GenerationError;
pub use gemini::{GeminiClient, GeminiConfig};
pub use generator::TextGenerator;
pub use prompt::InsightPrompt;
