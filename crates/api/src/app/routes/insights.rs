use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse};
use tracing::info;

use crate::app::errors;
use crate::app::services::AppServices;

/// Forget every memoized insight; the next request regenerates.
pub async fn clear_insights(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.insights().clear().await {
        Ok(()) => {
            info!("insight cache cleared");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => errors::insight_error_to_response(e, services.retry_after()),
    }
}
