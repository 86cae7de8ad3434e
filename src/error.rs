//! Error types for the City Library server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::repository::StorageError;

/// Numeric error codes carried in API error bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    StorageFailure = 3,
    NoSuchReader = 4,
    NoSuchBook = 5,
    BookNotAvailable = 7,
    Duplicate = 8,
    AlreadyBorrowed = 13,
    NotBorrowed = 14,
    BadValue = 18,
    BadSelection = 19,
    PartiallyApplied = 22,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Reader \"{0}\" already exists")]
    DuplicateReader(String),

    #[error("No reader found with name \"{0}\"")]
    ReaderNotFound(String),

    #[error("No book found: {0}")]
    BookNotFound(String),

    #[error("Book is not available: {0}")]
    BookUnavailable(String),

    #[error("Reader \"{reader}\" already holds {book}")]
    AlreadyBorrowed { reader: String, book: String },

    #[error("Book was not borrowed by \"{reader}\": {book}")]
    BookNotBorrowed { reader: String, book: String },

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[source] StorageError),

    #[error("{operation} applied in memory but could not be saved: {source}")]
    PersistenceWrite {
        operation: &'static str,
        #[source]
        source: StorageError,
    },
}

impl AppError {
    /// Input-shape errors the presentation layer answers by asking again
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::InvalidSelection(_))
    }

    /// The operation changed in-memory state even though it returned an error
    pub fn is_applied(&self) -> bool {
        matches!(self, AppError::PersistenceWrite { .. })
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::DuplicateReader(_) => (StatusCode::CONFLICT, ErrorCode::Duplicate),
            AppError::ReaderNotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchReader),
            AppError::BookNotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchBook),
            AppError::BookUnavailable(_) => {
                (StatusCode::CONFLICT, ErrorCode::BookNotAvailable)
            }
            AppError::AlreadyBorrowed { .. } => {
                (StatusCode::CONFLICT, ErrorCode::AlreadyBorrowed)
            }
            AppError::BookNotBorrowed { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::NotBorrowed)
            }
            AppError::InvalidSelection(_) => (StatusCode::BAD_REQUEST, ErrorCode::BadSelection),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue),
            AppError::StorageUnavailable(e) => {
                tracing::error!("Storage unavailable: {:?}", e);
                (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::StorageFailure)
            }
            AppError::PersistenceWrite { operation, source } => {
                tracing::error!("Failed to persist {}: {:?}", operation, source);
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::PartiallyApplied)
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
