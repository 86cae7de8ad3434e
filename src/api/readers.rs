//! Reader and loan endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookKey, Reader},
    services::{BookSelection, LoanReceipt},
    AppState,
};

/// Register reader request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterReaderRequest {
    #[validate(length(min = 1, message = "Reader name cannot be empty"))]
    pub name: String,
}

/// Book selection for a borrow or return.
///
/// Either `index` (1-based position in the list the client showed) or both
/// `title` and `author`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SelectionRequest {
    pub index: Option<usize>,
    pub title: Option<String>,
    pub author: Option<String>,
}

impl TryFrom<SelectionRequest> for BookSelection {
    type Error = AppError;

    fn try_from(request: SelectionRequest) -> Result<Self, Self::Error> {
        match request {
            SelectionRequest { index: Some(index), .. } => Ok(BookSelection::Position(index)),
            SelectionRequest {
                title: Some(title),
                author: Some(author),
                ..
            } => Ok(BookSelection::Key(BookKey::new(title, author))),
            _ => Err(AppError::Validation(
                "Provide either index or both title and author".to_string(),
            )),
        }
    }
}

/// List registered readers
#[utoipa::path(
    get,
    path = "/readers",
    tag = "readers",
    responses(
        (status = 200, description = "Readers in registration order", body = Vec<Reader>)
    )
)]
pub async fn list_readers(State(state): State<AppState>) -> Json<Vec<Reader>> {
    let core = state.lending.lock().await;
    Json(core.list_readers().to_vec())
}

/// Register a new reader
#[utoipa::path(
    post,
    path = "/readers",
    tag = "readers",
    request_body = RegisterReaderRequest,
    responses(
        (status = 201, description = "Reader registered", body = Reader),
        (status = 400, description = "Invalid name", body = crate::error::ErrorResponse),
        (status = 409, description = "Reader already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn register_reader(
    State(state): State<AppState>,
    Json(request): Json<RegisterReaderRequest>,
) -> AppResult<(StatusCode, Json<Reader>)> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let mut core = state.lending.lock().await;
    let reader = core.register_reader(&request.name).await?;
    Ok((StatusCode::CREATED, Json(reader)))
}

/// Books currently held by a reader
#[utoipa::path(
    get,
    path = "/readers/{name}/books",
    tag = "readers",
    params(
        ("name" = String, Path, description = "Reader name (case-insensitive)")
    ),
    responses(
        (status = 200, description = "Borrowed books in borrow order", body = Vec<Book>),
        (status = 404, description = "Reader not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn reader_books(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<Vec<Book>>> {
    let core = state.lending.lock().await;
    let books = core.list_by_reader(&name)?.into_iter().cloned().collect();
    Ok(Json(books))
}

/// Lend a book to a reader
#[utoipa::path(
    post,
    path = "/readers/{name}/borrow",
    tag = "loans",
    params(
        ("name" = String, Path, description = "Reader name (case-insensitive)")
    ),
    request_body = SelectionRequest,
    responses(
        (status = 200, description = "Book borrowed", body = LoanReceipt),
        (status = 400, description = "Invalid selection", body = crate::error::ErrorResponse),
        (status = 404, description = "Reader or book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Book unavailable or already held", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<SelectionRequest>,
) -> AppResult<Json<LoanReceipt>> {
    let selection = BookSelection::try_from(request)?;
    let mut core = state.lending.lock().await;
    Ok(Json(core.borrow(&name, selection).await?))
}

/// Take a book back from a reader
#[utoipa::path(
    post,
    path = "/readers/{name}/return",
    tag = "loans",
    params(
        ("name" = String, Path, description = "Reader name (case-insensitive)")
    ),
    request_body = SelectionRequest,
    responses(
        (status = 200, description = "Book returned", body = LoanReceipt),
        (status = 400, description = "Invalid selection", body = crate::error::ErrorResponse),
        (status = 404, description = "Reader not found", body = crate::error::ErrorResponse),
        (status = 422, description = "Book not borrowed by this reader", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<SelectionRequest>,
) -> AppResult<Json<LoanReceipt>> {
    let selection = BookSelection::try_from(request)?;
    let mut core = state.lending.lock().await;
    Ok(Json(core.return_book(&name, selection).await?))
}
