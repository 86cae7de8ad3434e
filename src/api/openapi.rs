//! OpenAPI documentation

use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

use crate::api::{books, health, readers};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "City Library API",
        version = "1.0.0",
        description = "Book catalog and lending REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        health::health_check,
        // Books
        books::list_books,
        books::add_book,
        books::available_books,
        books::sorted_books,
        books::search_books,
        // Readers and loans
        readers::list_readers,
        readers::register_reader,
        readers::reader_books,
        readers::borrow_book,
        readers::return_book,
    ),
    components(
        schemas(
            crate::models::Book,
            crate::models::BookKey,
            crate::models::Reader,
            crate::services::LoanReceipt,
            crate::services::SortKey,
            crate::services::SearchField,
            books::AddBookRequest,
            readers::RegisterReaderRequest,
            readers::SelectionRequest,
            health::HealthResponse,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Catalog management"),
        (name = "readers", description = "Reader management"),
        (name = "loans", description = "Borrowing and returning")
    )
)]
pub struct ApiDoc;

/// Serve the OpenAPI document as JSON
pub fn create_openapi_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
}
