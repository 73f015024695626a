//! Bounded retry with exponential backoff for single remote calls.
//!
//! Only throttling is retried. Every other failure surfaces on the first
//! occurrence.

pub mod executor;
pub mod policy;

pub use executor::{BackoffExecutor, Classify, RetryClass, RetryError};
pub use policy::RetryPolicy;
