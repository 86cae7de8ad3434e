//! File storage: each collection is dumped whole as one JSON document

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use super::{Capability, LibrarySnapshot, SaveRequest, StorageError, StorageGateway, StorageResult};

pub const BOOKS_FILE: &str = "books.json";
pub const READERS_FILE: &str = "readers.json";

#[derive(Clone, Debug)]
pub struct FileGateway {
    data_dir: PathBuf,
}

impl FileGateway {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    /// Read a collection; a missing file is an empty collection
    async fn read_collection<T: DeserializeOwned>(&self, file_name: &str) -> StorageResult<Vec<T>> {
        let path = self.data_dir.join(file_name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("{} not found, starting empty", path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Replace a collection file through a temporary sibling and a rename
    async fn write_collection<T: Serialize>(&self, file_name: &str, items: &[T]) -> StorageResult<()> {
        tokio::fs::create_dir_all(&self.data_dir).await?;

        let path = self.data_dir.join(file_name);
        let tmp = self.data_dir.join(format!("{}.tmp", file_name));
        let bytes = serde_json::to_vec_pretty(items)?;

        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::debug!("Wrote {} records to {}", items.len(), path.display());
        Ok(())
    }
}

#[async_trait]
impl StorageGateway for FileGateway {
    fn capability(&self) -> Capability {
        Capability::Bulk
    }

    fn name(&self) -> &'static str {
        "file"
    }

    async fn load(&self) -> StorageResult<LibrarySnapshot> {
        Ok(LibrarySnapshot {
            books: self.read_collection(BOOKS_FILE).await?,
            readers: self.read_collection(READERS_FILE).await?,
        })
    }

    async fn save(&self, request: SaveRequest<'_>) -> StorageResult<()> {
        match request {
            SaveRequest::Catalog(catalog) => self.write_collection(BOOKS_FILE, catalog.books()).await,
            SaveRequest::Readers(readers) => {
                self.write_collection(READERS_FILE, readers.readers()).await
            }
            SaveRequest::Changes(_) => Err(StorageError::Unsupported(request.describe())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Book, BookKey, Catalog};

    #[tokio::test]
    async fn test_missing_files_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = FileGateway::new(dir.path().join("not-yet-created"));
        let snapshot = gateway.load().await.unwrap();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_record_changes() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = FileGateway::new(dir.path());
        let err = gateway.save(SaveRequest::Changes(&[])).await.unwrap_err();
        assert!(matches!(err, StorageError::Unsupported(_)));
    }

    #[tokio::test]
    async fn test_corrupt_blob_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(BOOKS_FILE), b"{not json").unwrap();
        let gateway = FileGateway::new(dir.path());
        assert!(matches!(gateway.load().await, Err(StorageError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = FileGateway::new(dir.path());
        let catalog = Catalog::from_books(vec![Book::new(BookKey::new("Dune", "Herbert"))]).unwrap();

        gateway.save(SaveRequest::Catalog(&catalog)).await.unwrap();

        assert!(dir.path().join(BOOKS_FILE).exists());
        assert!(!dir.path().join(format!("{}.tmp", BOOKS_FILE)).exists());
    }
}
