//! Book model and its (title, author) identity

use serde::{Deserialize, Serialize};
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use utoipa::ToSchema;

/// Fold a string for case-insensitive identity comparisons.
pub fn fold(s: &str) -> String {
    s.nfc().collect::<String>().to_lowercase()
}

/// Identity of a book: the (title, author) pair as first entered.
///
/// Lookups compare keys case-insensitively through [`BookKey::folded`];
/// the stored spelling is kept for display and persistence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct BookKey {
    pub title: String,
    pub author: String,
}

impl BookKey {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
        }
    }

    /// Folded form used as the lookup key
    pub fn folded(&self) -> (String, String) {
        (fold(&self.title), fold(&self.author))
    }

    /// Case-insensitive identity comparison
    pub fn matches(&self, other: &BookKey) -> bool {
        self.folded() == other.folded()
    }
}

impl std::fmt::Display for BookKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\" by {}", self.title, self.author)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuantityError {
    #[error("available quantity {available} exceeds total quantity {total} for {key}")]
    AvailableExceedsTotal {
        key: BookKey,
        available: u32,
        total: u32,
    },
}

/// Raw persisted shape of a book, validated before it becomes a [`Book`]
#[derive(Deserialize)]
struct BookRecord {
    title: String,
    author: String,
    available_quantity: u32,
    total_quantity: u32,
}

impl TryFrom<BookRecord> for Book {
    type Error = QuantityError;

    fn try_from(r: BookRecord) -> Result<Self, Self::Error> {
        Book::from_parts(BookKey::new(r.title, r.author), r.available_quantity, r.total_quantity)
    }
}

/// A catalog entry. Copies of the same title are fungible counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "BookRecord")]
pub struct Book {
    title: String,
    author: String,
    available_quantity: u32,
    total_quantity: u32,
}

impl Book {
    /// A freshly added title with a single copy on the shelf
    pub fn new(key: BookKey) -> Self {
        Self {
            title: key.title,
            author: key.author,
            available_quantity: 1,
            total_quantity: 1,
        }
    }

    /// Rebuild a book from stored quantities
    pub fn from_parts(key: BookKey, available: u32, total: u32) -> Result<Self, QuantityError> {
        if available > total {
            return Err(QuantityError::AvailableExceedsTotal {
                key,
                available,
                total,
            });
        }
        Ok(Self {
            title: key.title,
            author: key.author,
            available_quantity: available,
            total_quantity: total,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn key(&self) -> BookKey {
        BookKey::new(self.title.clone(), self.author.clone())
    }

    pub fn available_quantity(&self) -> u32 {
        self.available_quantity
    }

    pub fn total_quantity(&self) -> u32 {
        self.total_quantity
    }

    pub fn is_available(&self) -> bool {
        self.available_quantity > 0
    }

    /// One more copy enters the library
    pub(crate) fn add_copy(&mut self) {
        self.available_quantity += 1;
        self.total_quantity += 1;
    }

    /// Take one copy off the shelf. Returns false when none is left.
    pub(crate) fn check_out(&mut self) -> bool {
        if self.available_quantity == 0 {
            return false;
        }
        self.available_quantity -= 1;
        true
    }

    /// Put one copy back. Returns false when the shelf was already full.
    pub(crate) fn check_in(&mut self) -> bool {
        if self.available_quantity >= self.total_quantity {
            return false;
        }
        self.available_quantity += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_matching_ignores_case() {
        let a = BookKey::new("Dune", "Frank Herbert");
        let b = BookKey::new("DUNE", "frank herbert");
        assert!(a.matches(&b));
        assert!(!a.matches(&BookKey::new("Dune Messiah", "Frank Herbert")));
    }

    #[test]
    fn test_fold_normalizes_composition() {
        // "é" precomposed vs "e" + combining acute
        assert_eq!(fold("Émile"), fold("E\u{301}mile"));
    }

    #[test]
    fn test_quantity_bounds() {
        let mut book = Book::new(BookKey::new("Dune", "Herbert"));
        assert!(book.check_out());
        assert!(!book.check_out());
        assert!(!book.is_available());
        assert!(book.check_in());
        assert!(!book.check_in());
        assert_eq!(book.available_quantity(), 1);
        assert_eq!(book.total_quantity(), 1);
    }

    #[test]
    fn test_from_parts_rejects_overfull_shelf() {
        let err = Book::from_parts(BookKey::new("Dune", "Herbert"), 3, 2).unwrap_err();
        assert!(matches!(err, QuantityError::AvailableExceedsTotal { available: 3, total: 2, .. }));
    }

    #[test]
    fn test_deserialize_validates_quantities() {
        let ok: Book = serde_json::from_str(
            r#"{"title":"Dune","author":"Herbert","available_quantity":1,"total_quantity":2}"#,
        )
        .unwrap();
        assert_eq!(ok.available_quantity(), 1);

        let bad = serde_json::from_str::<Book>(
            r#"{"title":"Dune","author":"Herbert","available_quantity":5,"total_quantity":2}"#,
        );
        assert!(bad.is_err());
    }
}
