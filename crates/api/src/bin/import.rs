//! `libris-import`: pull Internet Archive collections into the book store.
//!
//! Without arguments it imports the default set (`gutenberg`, 100 items and
//! `iacl`, 50 items). Otherwise each `--collection NAME[:MAX]` is imported in
//! order.

use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use libris_api::config::{DatabaseArgs, ImportArgs, RetryArgs};
use libris_infra::archive::{InternetArchiveClient, InternetArchiveConfig};
use libris_infra::ingest::{ImportPipeline, ImportSummary};
use libris_infra::store::{BookStore, InMemoryBookStore, MySqlBookStore};
use libris_observability::LogFormat;

const DEFAULT_COLLECTIONS: &[(&str, usize)] = &[("gutenberg", 100), ("iacl", 50)];

#[derive(Parser, Debug)]
#[command(name = "libris-import")]
#[command(about = "Import Internet Archive text collections into the book store")]
struct Args {
    /// Collection to import, optionally capped: `name` or `name:max`
    #[arg(long = "collection", short = 'c')]
    collections: Vec<String>,

    #[command(flatten)]
    db: DatabaseArgs,

    #[command(flatten)]
    retry: RetryArgs,

    #[command(flatten)]
    import: ImportArgs,

    /// Internet Archive base URL
    #[arg(long, env = "IA_BASE_URL", default_value = "https://archive.org")]
    archive_url: String,

    /// Log output: `json` or `pretty`
    #[arg(long, env = "LOG_FORMAT", default_value = "pretty")]
    log_format: LogFormat,
}

/// `name` or `name:max`.
fn parse_target(raw: &str) -> anyhow::Result<(String, Option<usize>)> {
    let (name, max) = match raw.rsplit_once(':') {
        Some((name, max)) => {
            let max = max
                .parse::<usize>()
                .with_context(|| format!("invalid item cap in {raw:?}"))?;
            (name, Some(max))
        }
        None => (raw, None),
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("empty collection name in {raw:?}");
    }
    Ok((name.to_string(), max))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    libris_observability::init(args.log_format);

    let targets: Vec<(String, Option<usize>)> = if args.collections.is_empty() {
        DEFAULT_COLLECTIONS
            .iter()
            .map(|(name, max)| (name.to_string(), Some(*max)))
            .collect()
    } else {
        args.collections
            .iter()
            .map(|raw| parse_target(raw))
            .collect::<anyhow::Result<_>>()?
    };

    let source = InternetArchiveClient::new(InternetArchiveConfig::default().with_base_url(&args.archive_url))
        .context("failed to build Internet Archive client")?;

    let db = args.db.to_config();
    let store: Arc<dyn BookStore> = if args.db.in_memory {
        Arc::new(InMemoryBookStore::new())
    } else {
        let url = db.connection_url().context("invalid database configuration")?;
        let store = MySqlBookStore::connect(&url)
            .await
            .context("failed to connect to the book store")?;
        store.ensure_schema().await.context("failed to create schema")?;
        Arc::new(store)
    };

    let pipeline = ImportPipeline::new(source, store, args.import.to_config(args.retry.to_policy()));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; stopping after the current item");
            on_signal.cancel();
        }
    });

    let mut summaries: Vec<ImportSummary> = Vec::with_capacity(targets.len());
    for (collection, max_items) in targets {
        if cancel.is_cancelled() {
            break;
        }
        let summary = pipeline
            .import_collection_cancellable(&collection, max_items, &cancel)
            .await;
        println!(
            "{}: processed={} skipped={} failed={}",
            summary.collection, summary.processed, summary.skipped, summary.failed
        );
        summaries.push(summary);
    }

    println!("{}", serde_json::to_string_pretty(&summaries)?);
    Ok(())
}
