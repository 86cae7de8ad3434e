//! Lending core.
//!
//! [`LendingCore`] owns the catalog and the reader directory for the life of
//! the process. Every mutation happens in memory first; afterwards the core
//! works out which records changed and hands exactly that to the storage
//! gateway, shaped for the gateway's [`Capability`]. A failed save leaves
//! the in-memory change in place and is reported as
//! [`AppError::PersistenceWrite`]; its changes are kept and sent again,
//! ahead of the next operation's own, until a save succeeds.

use std::{collections::HashSet, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::{book::fold, Book, BookKey, Catalog, ModelError, Reader, ReaderDirectory},
    repository::{Capability, Change, LibrarySnapshot, SaveRequest, StorageError, StorageGateway},
};

/// Field used to order catalog listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Title,
    Author,
}

/// Field matched by catalog searches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SearchField {
    Title,
    Author,
}

fn parse_field(s: &str) -> AppResult<bool> {
    match s.trim().to_lowercase().as_str() {
        "title" => Ok(true),
        "author" => Ok(false),
        other => Err(AppError::Validation(format!(
            "Unknown field \"{}\", expected \"title\" or \"author\"",
            other
        ))),
    }
}

impl FromStr for SortKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if parse_field(s)? { SortKey::Title } else { SortKey::Author })
    }
}

impl FromStr for SearchField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if parse_field(s)? { SearchField::Title } else { SearchField::Author })
    }
}

/// How a borrow or return names its book
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookSelection {
    /// 1-based position in the list shown to the user: available books for
    /// a borrow, the reader's borrowed books for a return
    Position(usize),
    /// Direct (title, author) reference
    Key(BookKey),
}

/// Parse a typed position, rejecting anything that is not a number
pub fn parse_position(input: &str) -> AppResult<usize> {
    input
        .trim()
        .parse::<usize>()
        .map_err(|_| AppError::InvalidSelection(format!("\"{}\" is not a number", input.trim())))
}

fn check_position(position: usize, len: usize) -> AppResult<usize> {
    if position == 0 || position > len {
        return Err(AppError::InvalidSelection(format!(
            "Please enter a number between 1 and {}",
            len
        )));
    }
    Ok(position - 1)
}

fn require<'a>(what: &str, value: &'a str) -> AppResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{} cannot be empty", what)));
    }
    Ok(value)
}

/// Outcome of a borrow or return
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoanReceipt {
    pub reader: String,
    pub book: Book,
}

pub struct LendingCore {
    catalog: Catalog,
    readers: ReaderDirectory,
    gateway: Arc<dyn StorageGateway>,
    capability: Capability,
    /// Changes whose save failed, oldest first
    pending: Vec<Change>,
}

impl LendingCore {
    /// Load stored state through the gateway and re-link every reader's
    /// borrowed keys to the catalog entries.
    pub async fn open(gateway: Arc<dyn StorageGateway>) -> AppResult<Self> {
        let capability = gateway.capability();
        let snapshot = gateway.load().await.map_err(AppError::StorageUnavailable)?;

        if snapshot.is_empty() {
            tracing::info!("No stored library found in {} storage, starting empty", gateway.name());
        }

        let (catalog, readers) = Self::assemble(snapshot)
            .map_err(|e| AppError::StorageUnavailable(StorageError::from(e)))?;

        tracing::info!(
            "Loaded {} books and {} readers from {} storage ({:?})",
            catalog.len(),
            readers.len(),
            gateway.name(),
            capability
        );

        Ok(Self {
            catalog,
            readers,
            gateway,
            capability,
            pending: Vec::new(),
        })
    }

    fn assemble(snapshot: LibrarySnapshot) -> Result<(Catalog, ReaderDirectory), ModelError> {
        let catalog = Catalog::from_books(snapshot.books)?;
        let mut readers = ReaderDirectory::from_readers(snapshot.readers)?;

        for reader in readers.iter_mut() {
            let name = reader.name().to_string();
            let mut seen = HashSet::new();
            reader.relink(|key| {
                let book = catalog.get(key).ok_or_else(|| ModelError::DanglingBorrow {
                    reader: name.clone(),
                    book: key.clone(),
                })?;
                if !seen.insert(key.folded()) {
                    return Err(ModelError::DuplicateBorrow {
                        reader: name.clone(),
                        book: key.clone(),
                    });
                }
                Ok(book.key())
            })?;
        }

        for book in catalog.iter() {
            let holders = readers.iter().filter(|r| r.holds(&book.key())).count() as u64;
            let out = u64::from(book.total_quantity() - book.available_quantity());
            if holders != out {
                tracing::warn!(
                    "{} is held by {} readers but {} copies are out",
                    book.key(),
                    holders,
                    out
                );
            }
        }

        Ok((catalog, readers))
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Number of changes still waiting for a successful save
    pub fn unsaved_changes(&self) -> usize {
        self.pending.len()
    }

    pub fn reader(&self, name: &str) -> Option<&Reader> {
        self.readers.get(name)
    }

    fn require_reader(&self, name: &str) -> AppResult<&Reader> {
        self.readers
            .get(name)
            .ok_or_else(|| AppError::ReaderNotFound(name.trim().to_string()))
    }

    // =========================================================================
    // READ
    // =========================================================================

    pub fn list_readers(&self) -> &[Reader] {
        self.readers.readers()
    }

    pub fn list_all(&self) -> Vec<&Book> {
        self.catalog.iter().collect()
    }

    pub fn list_available(&self) -> Vec<&Book> {
        self.catalog.iter().filter(|b| b.is_available()).collect()
    }

    /// Books held by a reader, in borrow order, resolved from the catalog
    pub fn list_by_reader(&self, name: &str) -> AppResult<Vec<&Book>> {
        let reader = self.require_reader(name)?;
        Ok(reader
            .borrowed()
            .iter()
            .filter_map(|key| self.catalog.get(key))
            .collect())
    }

    /// Case-sensitive ordering by one field; equal values keep catalog order
    pub fn list_sorted(&self, key: SortKey) -> Vec<&Book> {
        let mut books = self.list_all();
        match key {
            SortKey::Title => books.sort_by(|a, b| a.title().cmp(b.title())),
            SortKey::Author => books.sort_by(|a, b| a.author().cmp(b.author())),
        }
        books
    }

    /// Case-insensitive substring match on one field
    pub fn search(&self, query: &str, field: SearchField) -> Vec<&Book> {
        let needle = fold(query.trim());
        self.catalog
            .iter()
            .filter(|b| {
                let hay = match field {
                    SearchField::Title => b.title(),
                    SearchField::Author => b.author(),
                };
                fold(hay).contains(&needle)
            })
            .collect()
    }

    // =========================================================================
    // WRITE
    // =========================================================================

    pub async fn register_reader(&mut self, name: &str) -> AppResult<Reader> {
        let name = require("Reader name", name)?;
        if self.readers.contains(name) {
            return Err(AppError::DuplicateReader(name.to_string()));
        }

        let reader = self
            .readers
            .insert(Reader::new(name))
            .map_err(|_| AppError::DuplicateReader(name.to_string()))?
            .clone();
        tracing::info!("Registered reader \"{}\"", reader.name());

        self.persist("reader registration", vec![Change::InsertReader(reader.name().to_string())])
            .await?;
        Ok(reader)
    }

    /// Add one copy of a title, creating the catalog entry if needed
    pub async fn add_book(&mut self, title: &str, author: &str) -> AppResult<Book> {
        let key = BookKey::new(require("Title", title)?, require("Author", author)?);

        let book = if let Some(existing) = self.catalog.get_mut(&key) {
            existing.add_copy();
            existing.clone()
        } else {
            self.catalog
                .insert(Book::new(key.clone()))
                .map_err(|e| AppError::Validation(e.to_string()))?
                .clone()
        };
        tracing::info!(
            "Added copy of {} ({}/{})",
            book.key(),
            book.available_quantity(),
            book.total_quantity()
        );

        self.persist("book addition", vec![Change::UpsertBook(book.clone())]).await?;
        Ok(book)
    }

    fn resolve_available(&self, selection: &BookSelection) -> AppResult<BookKey> {
        match selection {
            BookSelection::Position(position) => {
                let available = self.list_available();
                if available.is_empty() {
                    return Err(AppError::BookUnavailable(
                        "no books are currently available".to_string(),
                    ));
                }
                let index = check_position(*position, available.len())?;
                Ok(available[index].key())
            }
            BookSelection::Key(key) => {
                let book = self
                    .catalog
                    .get(key)
                    .ok_or_else(|| AppError::BookNotFound(key.to_string()))?;
                if !book.is_available() {
                    return Err(AppError::BookUnavailable(book.key().to_string()));
                }
                Ok(book.key())
            }
        }
    }

    fn resolve_held(&self, reader: &Reader, selection: &BookSelection) -> AppResult<BookKey> {
        let held = reader.borrowed();
        match selection {
            BookSelection::Position(position) => {
                if held.is_empty() {
                    return Err(AppError::BookNotBorrowed {
                        reader: reader.name().to_string(),
                        book: "no books are currently borrowed".to_string(),
                    });
                }
                let index = check_position(*position, held.len())?;
                Ok(held[index].clone())
            }
            BookSelection::Key(key) => held
                .iter()
                .find(|k| k.matches(key))
                .cloned()
                .ok_or_else(|| AppError::BookNotBorrowed {
                    reader: reader.name().to_string(),
                    book: key.to_string(),
                }),
        }
    }

    /// Lend one copy to a reader. A reader holds at most one copy of a title.
    pub async fn borrow(&mut self, reader_name: &str, selection: BookSelection) -> AppResult<LoanReceipt> {
        let reader = self.require_reader(reader_name)?;
        let key = self.resolve_available(&selection)?;
        if reader.holds(&key) {
            return Err(AppError::AlreadyBorrowed {
                reader: reader.name().to_string(),
                book: key.to_string(),
            });
        }
        let reader_name = reader.name().to_string();

        let book = self
            .catalog
            .get_mut(&key)
            .ok_or_else(|| AppError::BookNotFound(key.to_string()))?;
        if !book.check_out() {
            return Err(AppError::BookUnavailable(key.to_string()));
        }
        let book = book.clone();
        if let Some(reader) = self.readers.get_mut(&reader_name) {
            reader.link(key.clone());
        }
        tracing::info!(
            "\"{}\" borrowed {} ({} left)",
            reader_name,
            key,
            book.available_quantity()
        );

        self.persist(
            "borrow",
            vec![
                Change::UpsertBook(book.clone()),
                Change::LinkBorrow {
                    reader: reader_name.clone(),
                    book: key,
                },
            ],
        )
        .await?;

        Ok(LoanReceipt {
            reader: reader_name,
            book,
        })
    }

    /// Take back a copy the reader holds
    pub async fn return_book(&mut self, reader_name: &str, selection: BookSelection) -> AppResult<LoanReceipt> {
        let reader = self.require_reader(reader_name)?;
        let key = self.resolve_held(reader, &selection)?;
        let reader_name = reader.name().to_string();

        let book = self
            .catalog
            .get_mut(&key)
            .ok_or_else(|| AppError::BookNotFound(key.to_string()))?;
        if !book.check_in() {
            tracing::warn!(
                "{} returned by \"{}\" but every copy was already on the shelf",
                key,
                reader_name
            );
        }
        let book = book.clone();
        if let Some(reader) = self.readers.get_mut(&reader_name) {
            reader.unlink(&key);
        }
        tracing::info!(
            "\"{}\" returned {} ({} available)",
            reader_name,
            key,
            book.available_quantity()
        );

        self.persist(
            "return",
            vec![
                Change::UpsertBook(book.clone()),
                Change::UnlinkBorrow {
                    reader: reader_name.clone(),
                    book: key,
                },
            ],
        )
        .await?;

        Ok(LoanReceipt {
            reader: reader_name,
            book,
        })
    }

    // =========================================================================
    // PERSISTENCE
    // =========================================================================

    async fn persist(&mut self, operation: &'static str, changes: Vec<Change>) -> AppResult<()> {
        let mut batch = std::mem::take(&mut self.pending);
        if !batch.is_empty() {
            tracing::info!("Retrying {} unsaved changes with {}", batch.len(), operation);
        }
        batch.extend(changes);

        let result = match self.capability {
            Capability::Incremental => self.gateway.save(SaveRequest::Changes(&batch)).await,
            Capability::Bulk => self.save_collections(&batch).await,
        };

        result.map_err(|source| {
            tracing::error!("Failed to persist {}: {}", operation, source);
            self.pending = batch;
            AppError::PersistenceWrite { operation, source }
        })
    }

    /// Dump each collection the changes touch. Both are attempted; the
    /// first failure is reported.
    async fn save_collections(&self, changes: &[Change]) -> Result<(), StorageError> {
        let mut first_error = None;

        if changes.iter().any(Change::touches_catalog) {
            if let Err(e) = self.gateway.save(SaveRequest::Catalog(&self.catalog)).await {
                first_error = Some(e);
            }
        }
        if changes.iter().any(Change::touches_readers) {
            if let Err(e) = self.gateway.save(SaveRequest::Readers(&self.readers)).await {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::StorageResult;
    use async_trait::async_trait;

    struct NullGateway;

    #[async_trait]
    impl StorageGateway for NullGateway {
        fn capability(&self) -> Capability {
            Capability::Incremental
        }

        fn name(&self) -> &'static str {
            "null"
        }

        async fn load(&self) -> StorageResult<LibrarySnapshot> {
            Ok(LibrarySnapshot::default())
        }

        async fn save(&self, _request: SaveRequest<'_>) -> StorageResult<()> {
            Ok(())
        }
    }

    async fn core() -> LendingCore {
        LendingCore::open(Arc::new(NullGateway)).await.unwrap()
    }

    #[test]
    fn test_parse_position() {
        assert_eq!(parse_position(" 3 ").unwrap(), 3);
        assert!(parse_position("three").unwrap_err().is_retryable());
        assert!(parse_position("-1").unwrap_err().is_retryable());
    }

    #[test]
    fn test_check_position_bounds() {
        assert_eq!(check_position(1, 2).unwrap(), 0);
        assert_eq!(check_position(2, 2).unwrap(), 1);
        assert!(check_position(0, 2).is_err());
        assert!(check_position(3, 2).is_err());
    }

    #[test]
    fn test_field_parsing() {
        assert_eq!("Title".parse::<SortKey>().unwrap(), SortKey::Title);
        assert_eq!("author".parse::<SearchField>().unwrap(), SearchField::Author);
        assert!(matches!("isbn".parse::<SortKey>(), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_sort_is_case_sensitive_and_stable() {
        let mut core = core().await;
        core.add_book("beta", "Smith").await.unwrap();
        core.add_book("Alpha", "Smith").await.unwrap();
        core.add_book("Gamma", "Adams").await.unwrap();

        let titles: Vec<_> = core.list_sorted(SortKey::Title).iter().map(|b| b.title()).collect();
        // uppercase sorts before lowercase
        assert_eq!(titles, vec!["Alpha", "Gamma", "beta"]);

        let titles: Vec<_> = core.list_sorted(SortKey::Author).iter().map(|b| b.title()).collect();
        assert_eq!(titles, vec!["Gamma", "beta", "Alpha"]);
    }

    #[tokio::test]
    async fn test_search_ignores_case() {
        let mut core = core().await;
        core.add_book("Dune", "Frank Herbert").await.unwrap();
        core.add_book("Dune Messiah", "Frank Herbert").await.unwrap();
        core.add_book("Foundation", "Isaac Asimov").await.unwrap();

        assert_eq!(core.search("DUNE", SearchField::Title).len(), 2);
        assert_eq!(core.search("asimov", SearchField::Author).len(), 1);
        assert!(core.search("asimov", SearchField::Title).is_empty());
    }

    #[tokio::test]
    async fn test_blank_input_rejected() {
        let mut core = core().await;
        assert!(matches!(core.register_reader("  ").await, Err(AppError::Validation(_))));
        assert!(matches!(core.add_book("Dune", "").await, Err(AppError::Validation(_))));
        assert!(core.catalog().is_empty());
    }

    #[test]
    fn test_assemble_rejects_dangling_borrow() {
        let snapshot = LibrarySnapshot {
            books: vec![Book::new(BookKey::new("Dune", "Herbert"))],
            readers: vec![Reader::with_borrowed("Alice", vec![BookKey::new("Emma", "Austen")])],
        };
        let err = LendingCore::assemble(snapshot).unwrap_err();
        assert!(matches!(err, ModelError::DanglingBorrow { .. }));
    }

    #[test]
    fn test_assemble_adopts_catalog_spelling() {
        let book = Book::from_parts(BookKey::new("Dune", "Herbert"), 0, 1).unwrap();
        let snapshot = LibrarySnapshot {
            books: vec![book],
            readers: vec![Reader::with_borrowed("Alice", vec![BookKey::new("DUNE", "herbert")])],
        };
        let (_, readers) = LendingCore::assemble(snapshot).unwrap();
        assert_eq!(readers.get("alice").unwrap().borrowed()[0].title, "Dune");
    }
}
