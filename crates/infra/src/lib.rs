//! `libris-infra`
//!
//! Adapters and the two resilient operations built on them:
//! - `archive`: content source boundary (Internet Archive client, in-memory source)
//! - `store`: transactional book store (MySQL/TiDB, in-memory)
//! - `retry`: backoff executor for throttled remote calls
//! - `ingest`: collection import pipeline and metadata normalizer
//! - `insights`: memoized, single-flight insight generation
//! - `config`: database connection settings

pub mod archive;
pub mod config;
pub mod ingest;
pub mod insights;
pub mod retry;
pub mod store;
