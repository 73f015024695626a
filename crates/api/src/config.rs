//! Command-line / environment configuration shared by both binaries.
//!
//! Every flag falls back to an environment variable, so a `.env`-style
//! deployment works without arguments.

use std::time::Duration;

use clap::Args;

use libris_ai::GeminiConfig;
use libris_infra::config::{DatabaseConfig, DatabaseParts};
use libris_infra::ingest::ImportConfig;
use libris_infra::retry::RetryPolicy;

/// Book store location.
#[derive(Args, Debug, Clone)]
pub struct DatabaseArgs {
    /// Full connection URL (overrides the TIDB_* parts)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(long, env = "TIDB_USER")]
    pub tidb_user: Option<String>,

    #[arg(long, env = "TIDB_PASSWORD", hide_env_values = true)]
    pub tidb_password: Option<String>,

    #[arg(long, env = "TIDB_HOST")]
    pub tidb_host: Option<String>,

    #[arg(long, env = "TIDB_PORT")]
    pub tidb_port: Option<u16>,

    #[arg(long, env = "TIDB_DB")]
    pub tidb_db: Option<String>,

    /// CA bundle for TLS connections to TiDB Cloud
    #[arg(long, env = "TIDB_SSL_CA_PATH")]
    pub tidb_ssl_ca_path: Option<String>,

    /// Use the in-memory store even if a database is configured
    #[arg(long, env = "LIBRIS_IN_MEMORY", default_value = "false")]
    pub in_memory: bool,
}

impl DatabaseArgs {
    pub fn to_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.database_url.clone(),
            parts: DatabaseParts {
                user: self.tidb_user.clone(),
                password: self.tidb_password.clone(),
                host: self.tidb_host.clone(),
                port: self.tidb_port,
                database: self.tidb_db.clone(),
                ssl_ca: self.tidb_ssl_ca_path.clone(),
            },
        }
    }
}

/// Backoff for throttled remote calls.
#[derive(Args, Debug, Clone)]
pub struct RetryArgs {
    /// Total attempts per remote call, first one included
    #[arg(long, env = "LIBRIS_RETRY_ATTEMPTS", default_value = "5")]
    pub retry_attempts: u32,

    /// Delay after the first throttled attempt, in milliseconds
    #[arg(long, env = "LIBRIS_RETRY_BASE_MS", default_value = "1000")]
    pub retry_base_ms: u64,
}

impl RetryArgs {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(self.retry_attempts, Duration::from_millis(self.retry_base_ms))
    }
}

/// Text generation API.
#[derive(Args, Debug, Clone)]
pub struct GeminiArgs {
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "LLM_MODEL", default_value = "gemini-2.5-flash-preview-05-20")]
    pub llm_model: String,

    /// Target insight length, in words
    #[arg(long, env = "LIBRIS_INSIGHT_WORDS", default_value = "300")]
    pub insight_words: u32,
}

impl GeminiArgs {
    pub fn to_config(&self) -> GeminiConfig {
        GeminiConfig::default()
            .with_api_key(self.api_key.clone().unwrap_or_default())
            .with_model(self.llm_model.clone())
    }
}

/// Import batching.
#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    /// Staged books per commit
    #[arg(long, env = "LIBRIS_BATCH_SIZE", default_value = "50")]
    pub batch_size: usize,

    /// Rows per search page
    #[arg(long, env = "LIBRIS_PAGE_SIZE", default_value = "100")]
    pub page_size: usize,
}

impl ImportArgs {
    pub fn to_config(&self, retry: RetryPolicy) -> ImportConfig {
        ImportConfig {
            batch_size: self.batch_size,
            page_size: self.page_size,
            retry,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        db: DatabaseArgs,
        #[command(flatten)]
        retry: RetryArgs,
        #[command(flatten)]
        import: ImportArgs,
    }

    #[test]
    fn flags_map_to_typed_configs() {
        let cli = TestCli::parse_from([
            "test",
            "--tidb-host",
            "db.local",
            "--tidb-user",
            "root",
            "--tidb-db",
            "books",
            "--retry-attempts",
            "3",
            "--retry-base-ms",
            "250",
            "--batch-size",
            "10",
            "--page-size",
            "100",
        ]);

        let db = cli.db.to_config();
        assert_eq!(db.parts.host.as_deref(), Some("db.local"));

        let policy = cli.retry.to_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(250));

        let import = cli.import.to_config(policy);
        assert_eq!(import.batch_size, 10);
        assert_eq!(import.retry.max_attempts, 3);
    }
}
