use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// Runs the import to completion and answers with its summary.
pub async fn run_import(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::ImportRequest>,
) -> axum::response::Response {
    let collection = body.collection.trim();
    if collection.is_empty() {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "collection is required");
    }

    let summary = services.import(collection, body.max_items).await;
    (StatusCode::OK, Json(summary)).into_response()
}
