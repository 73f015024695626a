//! Logging setup shared by the binaries.
//!
//! Each binary picks its [`LogFormat`] from `--log-format` / `LOG_FORMAT` and
//! calls [`init`] once at startup.

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use self::tracing::{LogFormat, init};
