use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

use libris_infra::archive::{InternetArchiveClient, InternetArchiveConfig};
use libris_infra::ingest::{ImportConfig, ImportPipeline};
use libris_infra::store::InMemoryBookStore;

#[derive(Default)]
struct Hits {
    metadata: AtomicUsize,
    downloads: AtomicUsize,
}

async fn search() -> Json<Value> {
    Json(json!({
        "response": {
            "numFound": 2,
            "docs": [
                {"identifier": "alice", "title": "Alice"},
                {"identifier": "bob", "title": "Bob"}
            ]
        }
    }))
}

async fn metadata(State(hits): State<Arc<Hits>>, Path(id): Path<String>) -> Json<Value> {
    hits.metadata.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "metadata": {"identifier": id, "creator": "Someone"},
        "files": [{"name": format!("{id}.txt")}, {"name": format!("{id}.pdf")}]
    }))
}

async fn download(State(hits): State<Arc<Hits>>, Path((id, _file)): Path<(String, String)>) -> String {
    hits.downloads.fetch_add(1, Ordering::SeqCst);
    format!("full text of {id}")
}

/// Serves the three archive endpoints on an ephemeral port.
async fn spawn_archive(hits: Arc<Hits>) -> (String, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route("/advancedsearch.php", get(search))
        .route("/metadata/:id", get(metadata))
        .route("/download/:id/:file", get(download))
        .with_state(hits);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind ephemeral port");
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (base_url, handle)
}

#[tokio::test]
async fn import_fetches_each_item_record_once() {
    let hits = Arc::new(Hits::default());
    let (base_url, server) = spawn_archive(hits.clone()).await;
    let client = InternetArchiveClient::new(InternetArchiveConfig::default().with_base_url(base_url)).unwrap();
    let store = Arc::new(InMemoryBookStore::new());
    let pipeline = ImportPipeline::new(client, store.clone(), ImportConfig::default());

    let summary = pipeline.import_collection("demo", None).await;
    server.abort();

    assert_eq!((summary.processed, summary.failed), (2, 0));
    assert_eq!(hits.metadata.load(Ordering::SeqCst), 2);
    assert_eq!(hits.downloads.load(Ordering::SeqCst), 2);

    let books = store.books();
    assert_eq!(books[0].title, "Alice");
    assert_eq!(books[0].author.as_deref(), Some("Someone"));
    assert_eq!(books[1].content, "full text of bob");
}
