use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};

use libris_core::ExternalId;
use libris_infra::store::BookReader;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn list_books(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.books().list().await {
        Ok(books) => {
            let books: Vec<dto::BookListItem> = books.into_iter().map(Into::into).collect();
            Json(books).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_book(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let external_id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match services.books().find_by_external_id(&external_id).await {
        Ok(Some(book)) => Json(dto::BookResponse::from(book)).into_response(),
        Ok(None) => errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("book {external_id} not found"),
        ),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_insight(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let external_id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match services.insights().get_or_generate(&external_id).await {
        Ok(insight) => Json(dto::InsightResponse {
            external_id: external_id.into_inner(),
            insight,
        })
        .into_response(),
        Err(e) => errors::insight_error_to_response(e, services.retry_after()),
    }
}

fn parse_id(raw: &str) -> Result<ExternalId, axum::response::Response> {
    raw.parse::<ExternalId>()
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()))
}
