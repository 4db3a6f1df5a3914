use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{
    AppState, borrow_summary, create_book, create_borrow, delete_book, get_book, list_books,
    update_book,
};

/// Creates the API router with all library endpoints
///
/// Book endpoints:
/// - GET /api/books - List books (filter, sortBy, sort, limit)
/// - POST /api/books - Create a book
/// - GET /api/books/:id - Get a book
/// - PUT /api/books/:id - Update a book
/// - DELETE /api/books/:id - Delete a book
///
/// Borrow endpoints:
/// - POST /api/borrow - Borrow copies of a book
/// - GET /api/borrow - Borrowed books summary
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        .route("/api/books", get(list_books).post(create_book))
        .route(
            "/api/books/:id",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route("/api/borrow", get(borrow_summary).post(create_borrow))
        // Add tracing middleware
        .layer(TraceLayer::new_for_http())
        // Add application state
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
