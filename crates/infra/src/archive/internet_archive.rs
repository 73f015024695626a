//! Internet Archive client.
//!
//! Endpoints used:
//! - `GET /advancedsearch.php?q=..&fl[]=identifier&fl[]=title&fl[]=creator&rows=..&page=..&output=json`
//! - `GET /metadata/{identifier}` (metadata object + file list, one request per item)
//! - `GET /download/{identifier}/{filename}`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, instrument};

use libris_core::ExternalId;

use super::source::{ContentSource, SourceError};
use super::types::{FileEntry, ItemDetails, RawMetadata, SearchPage, SourceItem};

const ERROR_BODY_LIMIT: usize = 256;

#[derive(Debug, Clone)]
pub struct InternetArchiveConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for InternetArchiveConfig {
    fn default() -> Self {
        Self {
            base_url: "https://archive.org".to_string(),
            timeout: Duration::from_secs(120),
            user_agent: concat!("libris/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl InternetArchiveConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct InternetArchiveClient {
    http: reqwest::Client,
    base_url: Url,
}

impl InternetArchiveClient {
    pub fn new(config: InternetArchiveConfig) -> Result<Self, SourceError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| SourceError::Transport(format!("invalid base url: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        Ok(Self { http, base_url })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, SourceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::Transport("base url cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<reqwest::Response, SourceError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &body))
    }

    async fn get_json(&self, url: Url) -> Result<JsonValue, SourceError> {
        self.get(url)
            .await?
            .json::<JsonValue>()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))
    }

    async fn item_record(&self, identifier: &ExternalId) -> Result<ItemDetails, SourceError> {
        let url = self.url(&["metadata", identifier.as_str()])?;
        let json = self.get_json(url).await?;
        Ok(item_details(json))
    }
}

fn classify_status(status: StatusCode, body: &str) -> SourceError {
    let message: String = body.chars().take(ERROR_BODY_LIMIT).collect();
    if status == StatusCode::TOO_MANY_REQUESTS {
        SourceError::Throttled {
            status: status.as_u16(),
            message,
        }
    } else {
        SourceError::Remote {
            status: status.as_u16(),
            message,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    response: SearchResponse,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "numFound")]
    num_found: Option<usize>,
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

/// Listing fields requested with every search page.
const SEARCH_FIELDS: [&str; 3] = ["identifier", "title", "creator"];

#[derive(Debug, Deserialize)]
struct SearchDoc {
    identifier: String,
    #[serde(flatten)]
    fields: serde_json::Map<String, JsonValue>,
}

fn parse_search(json: JsonValue) -> Result<SearchPage, SourceError> {
    let envelope: SearchEnvelope =
        serde_json::from_value(json).map_err(|e| SourceError::Decode(e.to_string()))?;
    Ok(SearchPage {
        items: envelope
            .response
            .docs
            .into_iter()
            .map(|doc| {
                let listing = RawMetadata::from_json(&JsonValue::Object(doc.fields));
                SourceItem::new(doc.identifier).with_metadata(listing)
            })
            .collect(),
        total: envelope.response.num_found,
    })
}

/// Decode a `/metadata/{id}` answer. Unknown identifiers come back as `{}`.
fn item_details(json: JsonValue) -> ItemDetails {
    let metadata = json
        .get("metadata")
        .map(RawMetadata::from_json)
        .unwrap_or_default();
    let files = json
        .get("files")
        .and_then(JsonValue::as_array)
        .map(|files| {
            files
                .iter()
                .filter_map(|f| f.get("name").and_then(JsonValue::as_str))
                .map(FileEntry::new)
                .collect()
        })
        .unwrap_or_default();
    ItemDetails { metadata, files }
}

#[async_trait]
impl ContentSource for InternetArchiveClient {
    #[instrument(skip(self))]
    async fn search_items(
        &self,
        query: &str,
        page: u32,
        rows: usize,
    ) -> Result<SearchPage, SourceError> {
        let mut url = self.url(&["advancedsearch.php"])?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", query);
            for field in SEARCH_FIELDS {
                pairs.append_pair("fl[]", field);
            }
            pairs
                .append_pair("sort[]", "identifier asc")
                .append_pair("rows", &rows.to_string())
                .append_pair("page", &page.to_string())
                .append_pair("output", "json");
        }

        let page = parse_search(self.get_json(url).await?)?;
        debug!(returned = page.items.len(), total = ?page.total, "search page fetched");
        Ok(page)
    }

    async fn get_metadata(&self, identifier: &ExternalId) -> Result<RawMetadata, SourceError> {
        Ok(self.item_record(identifier).await?.metadata)
    }

    async fn get_file_list(&self, identifier: &ExternalId) -> Result<Vec<FileEntry>, SourceError> {
        Ok(self.item_record(identifier).await?.files)
    }

    #[instrument(skip(self, identifier), fields(identifier = %identifier))]
    async fn get_item(&self, identifier: &ExternalId) -> Result<ItemDetails, SourceError> {
        self.item_record(identifier).await
    }

    #[instrument(skip(self, identifier), fields(identifier = %identifier))]
    async fn download_file(
        &self,
        identifier: &ExternalId,
        filename: &str,
    ) -> Result<Vec<u8>, SourceError> {
        let url = self.url(&["download", identifier.as_str(), filename])?;
        let bytes = self
            .get(url)
            .await?
            .bytes()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> InternetArchiveClient {
        InternetArchiveClient::new(InternetArchiveConfig::default()).unwrap()
    }

    #[test]
    fn builds_escaped_download_urls() {
        let url = client()
            .url(&["download", "alice 1865", "alice 1865.txt"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://archive.org/download/alice%201865/alice%201865.txt"
        );
    }

    #[test]
    fn parses_search_page() {
        let page = parse_search(json!({
            "responseHeader": {"status": 0},
            "response": {
                "numFound": 2,
                "start": 0,
                "docs": [
                    {"identifier": "a", "title": "Alpha", "creator": ["X", "Y"]},
                    {"identifier": "b"}
                ]
            }
        }))
        .unwrap();

        assert_eq!(page.total, Some(2));
        let ids: Vec<_> = page.items.iter().map(|i| i.identifier.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(page.items[0].metadata.get("title").and_then(|v| v.first()), Some("Alpha"));
        assert_eq!(page.items[0].metadata.get("identifier"), None);
        assert!(page.items[1].metadata.is_empty());
    }

    #[test]
    fn search_without_response_is_a_decode_error() {
        assert!(matches!(
            parse_search(json!({"error": "bad query"})),
            Err(SourceError::Decode(_))
        ));
    }

    #[test]
    fn item_details_read_metadata_and_files() {
        let record = item_details(json!({
            "metadata": {"identifier": "alice", "creator": ["A", "B"]},
            "files": [{"name": "alice.txt", "format": "Text"}, {"format": "no name"}, {"name": "cover.jpg"}]
        }));

        assert_eq!(record.metadata.get("identifier").and_then(|v| v.first()), Some("alice"));
        assert_eq!(
            record.files,
            vec![FileEntry::new("alice.txt"), FileEntry::new("cover.jpg")]
        );
    }

    #[test]
    fn unknown_item_has_empty_details() {
        let record = item_details(json!({}));
        assert!(record.metadata.is_empty());
        assert!(record.files.is_empty());
    }

    #[test]
    fn rate_limit_status_is_throttled() {
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            SourceError::Throttled { status: 429, .. }
        ));
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, ""),
            SourceError::Remote { status: 404, .. }
        ));
    }
}
