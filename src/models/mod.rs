//! Data models for the library

pub mod book;
pub mod catalog;
pub mod directory;
pub mod reader;

use thiserror::Error;

// Re-export commonly used types
pub use book::{Book, BookKey, QuantityError};
pub use catalog::Catalog;
pub use directory::ReaderDirectory;
pub use reader::Reader;

/// Structural violations found while assembling catalog or directory state
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("duplicate book {0}")]
    DuplicateBook(BookKey),

    #[error("duplicate reader \"{0}\"")]
    DuplicateReader(String),

    #[error("reader \"{reader}\" holds {book}, which is not in the catalog")]
    DanglingBorrow { reader: String, book: BookKey },

    #[error("reader \"{reader}\" holds {book} more than once")]
    DuplicateBorrow { reader: String, book: BookKey },

    #[error(transparent)]
    Quantity(#[from] QuantityError),
}
