//! Storage layer: the gateway trait and its file and PostgreSQL backends

pub mod file;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    config::{AppConfig, StorageBackend},
    models::{Book, BookKey, Catalog, ModelError, Reader, ReaderDirectory},
};

/// Errors raised by storage backends
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stored data is inconsistent: {0}")]
    Corrupt(String),

    #[error("Backend does not accept {0}")]
    Unsupported(&'static str),
}

impl From<ModelError> for StorageError {
    fn from(e: ModelError) -> Self {
        StorageError::Corrupt(e.to_string())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Write granularity a backend supports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Only whole collections can be written
    Bulk,
    /// Individual records can be upserted or deleted by key
    Incremental,
}

/// A single record-level change produced by one lending operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    UpsertBook(Book),
    InsertReader(String),
    LinkBorrow { reader: String, book: BookKey },
    UnlinkBorrow { reader: String, book: BookKey },
}

impl Change {
    pub fn touches_catalog(&self) -> bool {
        matches!(self, Change::UpsertBook(_))
    }

    pub fn touches_readers(&self) -> bool {
        !self.touches_catalog()
    }
}

/// What the core hands to [`StorageGateway::save`]
#[derive(Debug, Clone, Copy)]
pub enum SaveRequest<'a> {
    Catalog(&'a Catalog),
    Readers(&'a ReaderDirectory),
    Changes(&'a [Change]),
}

impl SaveRequest<'_> {
    pub fn describe(&self) -> &'static str {
        match self {
            SaveRequest::Catalog(_) => "catalog dump",
            SaveRequest::Readers(_) => "reader dump",
            SaveRequest::Changes(_) => "record changes",
        }
    }
}

/// Everything a backend has stored, before borrowed keys are re-linked
#[derive(Debug, Clone, Default)]
pub struct LibrarySnapshot {
    pub books: Vec<Book>,
    pub readers: Vec<Reader>,
}

impl LibrarySnapshot {
    pub fn is_empty(&self) -> bool {
        self.books.is_empty() && self.readers.is_empty()
    }
}

/// Persistence backend used by the lending core.
///
/// `load` yields an empty snapshot when nothing has been stored yet and an
/// error only when the store itself cannot be read. Implementations must
/// not keep the borrowed references they are handed in `save`.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    fn capability(&self) -> Capability;

    /// Short backend name for logs
    fn name(&self) -> &'static str;

    async fn load(&self) -> StorageResult<LibrarySnapshot>;

    async fn save(&self, request: SaveRequest<'_>) -> StorageResult<()>;
}

/// Open the backend selected in configuration
pub async fn open_gateway(config: &AppConfig) -> StorageResult<Arc<dyn StorageGateway>> {
    match config.storage.backend {
        StorageBackend::File => {
            tracing::info!("Using file storage in {}", config.storage.data_dir.display());
            Ok(Arc::new(file::FileGateway::new(&config.storage.data_dir)))
        }
        StorageBackend::Db => {
            let gateway = postgres::PostgresGateway::connect(&config.database).await?;
            tracing::info!("Connected to database");
            Ok(Arc::new(gateway))
        }
    }
}
