use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use libris_ai::{GeminiClient, TextGenerator};
use libris_api::app::{self, AppServices};
use libris_api::config::{DatabaseArgs, GeminiArgs, ImportArgs, RetryArgs};
use libris_infra::archive::{InternetArchiveClient, InternetArchiveConfig};
use libris_infra::store::{InMemoryBookStore, MySqlBookStore};
use libris_observability::LogFormat;

/// HTTP API over the book store and the insight cache.
#[derive(Parser, Debug)]
#[command(name = "libris-api")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// Log output: `json` or `pretty`
    #[arg(long, env = "LOG_FORMAT", default_value = "json")]
    log_format: LogFormat,

    #[command(flatten)]
    db: DatabaseArgs,

    #[command(flatten)]
    gemini: GeminiArgs,

    #[command(flatten)]
    retry: RetryArgs,

    #[command(flatten)]
    import: ImportArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    libris_observability::init(args.log_format);

    if args.gemini.api_key.is_none() {
        tracing::warn!("API_KEY not set; insight generation will fail");
    }
    let generator: Arc<dyn TextGenerator> = Arc::new(
        GeminiClient::new(args.gemini.to_config()).context("failed to build Gemini client")?,
    );
    let source = Arc::new(
        InternetArchiveClient::new(InternetArchiveConfig::default())
            .context("failed to build Internet Archive client")?,
    );

    let db = args.db.to_config();
    let books: app::services::SharedStore = if args.db.in_memory || db.is_unset() {
        tracing::warn!("no database configured; using the in-memory book store");
        Arc::new(InMemoryBookStore::new())
    } else {
        let url = db.connection_url().context("invalid database configuration")?;
        let store = MySqlBookStore::connect(&url)
            .await
            .context("failed to connect to the book store")?;
        store.ensure_schema().await.context("failed to create schema")?;
        Arc::new(store)
    };

    let import = args.import.to_config(args.retry.to_policy());
    let services = Arc::new(AppServices::new(
        source,
        books,
        generator,
        import,
        args.gemini.insight_words,
    ));
    let router = app::build_app(services);

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}
