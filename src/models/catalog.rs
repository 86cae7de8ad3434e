//! Catalog: the ordered collection of distinct books

use std::collections::HashMap;

use super::{
    book::{Book, BookKey},
    ModelError,
};

/// Books in insertion order, indexed by folded (title, author).
///
/// Entries are never removed, so positions stay stable for the life of
/// the catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    books: Vec<Book>,
    index: HashMap<(String, String), usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from stored books, rejecting duplicate identities
    pub fn from_books(books: Vec<Book>) -> Result<Self, ModelError> {
        let mut catalog = Self::new();
        for book in books {
            catalog.insert(book)?;
        }
        Ok(catalog)
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Book> {
        self.books.iter()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn get(&self, key: &BookKey) -> Option<&Book> {
        self.index.get(&key.folded()).map(|&i| &self.books[i])
    }

    pub(crate) fn get_mut(&mut self, key: &BookKey) -> Option<&mut Book> {
        match self.index.get(&key.folded()) {
            Some(&i) => Some(&mut self.books[i]),
            None => None,
        }
    }

    /// Append a new book; fails if its identity is already present
    pub(crate) fn insert(&mut self, book: Book) -> Result<&mut Book, ModelError> {
        let folded = book.key().folded();
        if self.index.contains_key(&folded) {
            return Err(ModelError::DuplicateBook(book.key()));
        }
        let pos = self.books.len();
        self.index.insert(folded, pos);
        self.books.push(book);
        Ok(&mut self.books[pos])
    }
}
