use std::time::Duration;

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::IntoResponse;
use serde_json::json;

use libris_infra::insights::InsightError;
use libris_infra::store::StoreError;

/// Maps an insight failure to "not found" vs. "try again later".
pub fn insight_error_to_response(err: InsightError, retry_after: Duration) -> axum::response::Response {
    match err {
        InsightError::NotFound(id) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("book {id} not found"))
        }
        e if e.is_throttled() => {
            let mut response = json_error(StatusCode::SERVICE_UNAVAILABLE, "throttled", e.to_string());
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after.as_secs().max(1)));
            response
        }
        e @ (InsightError::GenerationFailed(_) | InsightError::EmptyResult(_)) => {
            json_error(StatusCode::BAD_GATEWAY, "generation_failed", e.to_string())
        }
        InsightError::Store(e) => store_error_to_response(e),
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use libris_ai::GenerationError;
    use libris_core::ExternalId;

    use super::*;

    #[test]
    fn throttled_generation_is_503_with_retry_after() {
        let err = InsightError::GenerationFailed(GenerationError::throttled(429, "quota"));
        let response = insight_error_to_response(err, Duration::from_secs(8));

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::RETRY_AFTER], "8");
    }

    #[test]
    fn statuses_by_kind() {
        let cases = [
            (InsightError::NotFound(ExternalId::new("x")), StatusCode::NOT_FOUND),
            (
                InsightError::GenerationFailed(GenerationError::remote(500, "down")),
                StatusCode::BAD_GATEWAY,
            ),
            (InsightError::EmptyResult(ExternalId::new("x")), StatusCode::BAD_GATEWAY),
            (
                InsightError::Store(StoreError::storage("gone")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(insight_error_to_response(err, Duration::from_secs(1)).status(), status);
        }
    }
}
