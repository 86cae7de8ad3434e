//! Shared test utilities

#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use citylibrary::{
    models::{Book, Reader},
    repository::{
        Capability, Change, LibrarySnapshot, SaveRequest, StorageError, StorageGateway,
        StorageResult,
    },
    services::LendingCore,
};

/// What a save call carried, in owned form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Saved {
    Catalog(usize),
    Readers(usize),
    Changes(Vec<Change>),
}

#[derive(Debug, Default)]
pub struct Store {
    pub books: Vec<Book>,
    pub readers: Vec<Reader>,
    pub saves: Vec<Saved>,
}

/// In-memory backend that behaves like a real one of either capability
/// and records every save request.
#[derive(Clone)]
pub struct MemoryGateway {
    capability: Capability,
    pub store: Arc<Mutex<Store>>,
    pub fail_saves: Arc<AtomicBool>,
    pub fail_load: Arc<AtomicBool>,
}

impl MemoryGateway {
    pub fn new(capability: Capability) -> Self {
        Self {
            capability,
            store: Arc::new(Mutex::new(Store::default())),
            fail_saves: Arc::new(AtomicBool::new(false)),
            fail_load: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn saves(&self) -> Vec<Saved> {
        self.store.lock().unwrap().saves.clone()
    }

    pub fn clear_saves(&self) {
        self.store.lock().unwrap().saves.clear();
    }

    pub fn stored_books(&self) -> Vec<Book> {
        self.store.lock().unwrap().books.clone()
    }

    pub fn stored_readers(&self) -> Vec<Reader> {
        self.store.lock().unwrap().readers.clone()
    }

    fn apply(store: &mut Store, change: &Change) {
        match change {
            Change::UpsertBook(book) => {
                match store.books.iter_mut().find(|b| b.key() == book.key()) {
                    Some(existing) => *existing = book.clone(),
                    None => store.books.push(book.clone()),
                }
            }
            Change::InsertReader(name) => {
                if !store.readers.iter().any(|r| r.name() == name) {
                    store.readers.push(Reader::new(name.clone()));
                }
            }
            Change::LinkBorrow { reader, book } => {
                if let Some(r) = store.readers.iter_mut().find(|r| r.name() == reader) {
                    let mut keys = r.borrowed().to_vec();
                    keys.push(book.clone());
                    *r = Reader::with_borrowed(r.name().to_string(), keys);
                }
            }
            Change::UnlinkBorrow { reader, book } => {
                if let Some(r) = store.readers.iter_mut().find(|r| r.name() == reader) {
                    let keys = r.borrowed().iter().filter(|k| *k != book).cloned().collect();
                    *r = Reader::with_borrowed(r.name().to_string(), keys);
                }
            }
        }
    }
}

#[async_trait]
impl StorageGateway for MemoryGateway {
    fn capability(&self) -> Capability {
        self.capability
    }

    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self) -> StorageResult<LibrarySnapshot> {
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "store offline",
            )));
        }
        let store = self.store.lock().unwrap();
        Ok(LibrarySnapshot {
            books: store.books.clone(),
            readers: store.readers.clone(),
        })
    }

    async fn save(&self, request: SaveRequest<'_>) -> StorageResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }

        let mut store = self.store.lock().unwrap();
        match (self.capability, request) {
            (Capability::Bulk, SaveRequest::Catalog(catalog)) => {
                store.books = catalog.books().to_vec();
                store.saves.push(Saved::Catalog(catalog.len()));
            }
            (Capability::Bulk, SaveRequest::Readers(readers)) => {
                store.readers = readers.readers().to_vec();
                store.saves.push(Saved::Readers(readers.len()));
            }
            (Capability::Incremental, SaveRequest::Changes(changes)) => {
                for change in changes {
                    Self::apply(&mut store, change);
                }
                store.saves.push(Saved::Changes(changes.to_vec()));
            }
            (_, other) => return Err(StorageError::Unsupported(other.describe())),
        }
        Ok(())
    }
}

pub async fn open_core(gateway: &MemoryGateway) -> LendingCore {
    LendingCore::open(Arc::new(gateway.clone()))
        .await
        .expect("failed to open lending core")
}

/// Every book satisfies 0 <= available <= total and the copies out match
/// the number of readers holding the title.
pub fn assert_consistent(core: &LendingCore) {
    for book in core.catalog().iter() {
        assert!(book.available_quantity() <= book.total_quantity(), "{:?}", book);
        let holders = core
            .list_readers()
            .iter()
            .filter(|r| r.holds(&book.key()))
            .count() as u32;
        assert_eq!(
            holders,
            book.total_quantity() - book.available_quantity(),
            "copies out of {} do not match holders",
            book.key()
        );
    }
}
