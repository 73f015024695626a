//! HTTP API and command-line surfaces over the ingestion pipeline and the
//! insight cache.

pub mod app;
pub mod config;
