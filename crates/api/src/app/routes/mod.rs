use axum::{
    Router,
    routing::{delete, get, post},
};

pub mod books;
pub mod imports;
pub mod insights;
pub mod system;

/// Router for the book, insight and import endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/books", get(books::list_books))
        .route("/books/:id", get(books::get_book))
        .route("/books/:id/insight", get(books::get_insight))
        .route("/insights", delete(insights::clear_insights))
        .route("/imports", post(imports::run_import))
}
