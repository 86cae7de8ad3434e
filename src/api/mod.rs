//! API handlers for the City Library REST endpoints

pub mod books;
pub mod health;
pub mod openapi;
pub mod readers;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Catalog
        .route("/books", get(books::list_books).post(books::add_book))
        .route("/books/available", get(books::available_books))
        .route("/books/sorted", get(books::sorted_books))
        .route("/books/search", get(books::search_books))
        // Readers and loans
        .route("/readers", get(readers::list_readers).post(readers::register_reader))
        .route("/readers/:name/books", get(readers::reader_books))
        .route("/readers/:name/borrow", post(readers::borrow_book))
        .route("/readers/:name/return", post(readers::return_book))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
