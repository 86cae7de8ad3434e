//! Catalog endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::Book,
    services::{SearchField, SortKey},
    AppState,
};

/// Add book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddBookRequest {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author cannot be empty"))]
    pub author: String,
}

/// Field names are parsed case-insensitively
#[derive(Debug, Deserialize)]
pub struct SortQuery {
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub field: String,
}

fn owned(books: Vec<&Book>) -> Vec<Book> {
    books.into_iter().cloned().collect()
}

/// Whole catalog in insertion order
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    responses(
        (status = 200, description = "All books", body = Vec<Book>)
    )
)]
pub async fn list_books(State(state): State<AppState>) -> Json<Vec<Book>> {
    let core = state.lending.lock().await;
    Json(owned(core.list_all()))
}

/// Add a copy of a book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = AddBookRequest,
    responses(
        (status = 201, description = "Copy added, returns updated quantities", body = Book),
        (status = 400, description = "Invalid title or author", body = crate::error::ErrorResponse)
    )
)]
pub async fn add_book(
    State(state): State<AppState>,
    Json(request): Json<AddBookRequest>,
) -> AppResult<(StatusCode, Json<Book>)> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let mut core = state.lending.lock().await;
    let book = core.add_book(&request.title, &request.author).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// Books with at least one copy on the shelf
#[utoipa::path(
    get,
    path = "/books/available",
    tag = "books",
    responses(
        (status = 200, description = "Available books", body = Vec<Book>)
    )
)]
pub async fn available_books(State(state): State<AppState>) -> Json<Vec<Book>> {
    let core = state.lending.lock().await;
    Json(owned(core.list_available()))
}

/// Catalog ordered by title or author
#[utoipa::path(
    get,
    path = "/books/sorted",
    tag = "books",
    params(
        ("key" = SortKey, Query, description = "Sort field: title or author")
    ),
    responses(
        (status = 200, description = "Sorted books", body = Vec<Book>),
        (status = 400, description = "Unknown sort field", body = crate::error::ErrorResponse)
    )
)]
pub async fn sorted_books(
    State(state): State<AppState>,
    Query(query): Query<SortQuery>,
) -> AppResult<Json<Vec<Book>>> {
    let key = query.key.parse::<SortKey>()?;
    let core = state.lending.lock().await;
    Ok(Json(owned(core.list_sorted(key))))
}

/// Case-insensitive search on title or author
#[utoipa::path(
    get,
    path = "/books/search",
    tag = "books",
    params(
        ("query" = String, Query, description = "Text to look for"),
        ("field" = SearchField, Query, description = "Search field: title or author")
    ),
    responses(
        (status = 200, description = "Matching books", body = Vec<Book>),
        (status = 400, description = "Unknown search field", body = crate::error::ErrorResponse)
    )
)]
pub async fn search_books(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<Book>>> {
    let field = query.field.parse::<SearchField>()?;
    let core = state.lending.lock().await;
    Ok(Json(owned(core.search(&query.query, field))))
}
