//! Insight generation cache.

pub mod service;
pub mod store;

pub use service::{InsightError, InsightService};
pub use store::{InMemoryInsightStore, InsightStore};
