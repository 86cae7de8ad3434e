//! Reader model

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::book::BookKey;

/// A registered reader and the titles they currently hold.
///
/// Borrowed books are stored as keys into the catalog, in borrow order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Reader {
    name: String,
    #[serde(default)]
    borrowed: Vec<BookKey>,
}

impl Reader {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            borrowed: Vec::new(),
        }
    }

    /// Rebuild a reader from storage
    pub fn with_borrowed(name: impl Into<String>, borrowed: Vec<BookKey>) -> Self {
        Self {
            name: name.into(),
            borrowed,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn borrowed(&self) -> &[BookKey] {
        &self.borrowed
    }

    pub fn holds(&self, key: &BookKey) -> bool {
        self.borrowed.iter().any(|k| k.matches(key))
    }

    /// Record a borrowed title. Returns false if it is already held.
    pub(crate) fn link(&mut self, key: BookKey) -> bool {
        if self.holds(&key) {
            return false;
        }
        self.borrowed.push(key);
        true
    }

    /// Drop a borrowed title. Returns false if it was not held.
    pub(crate) fn unlink(&mut self, key: &BookKey) -> bool {
        match self.borrowed.iter().position(|k| k.matches(key)) {
            Some(pos) => {
                self.borrowed.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Replace every borrowed key through `resolve`, keeping order
    pub(crate) fn relink<E>(
        &mut self,
        mut resolve: impl FnMut(&BookKey) -> Result<BookKey, E>,
    ) -> Result<(), E> {
        let mut relinked = Vec::with_capacity(self.borrowed.len());
        for key in &self.borrowed {
            relinked.push(resolve(key)?);
        }
        self.borrowed = relinked;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_rejects_second_copy() {
        let mut reader = Reader::new("Alice");
        assert!(reader.link(BookKey::new("Dune", "Herbert")));
        assert!(!reader.link(BookKey::new("dune", "HERBERT")));
        assert_eq!(reader.borrowed().len(), 1);
    }

    #[test]
    fn test_unlink_keeps_order() {
        let mut reader = Reader::new("Alice");
        reader.link(BookKey::new("A", "x"));
        reader.link(BookKey::new("B", "y"));
        reader.link(BookKey::new("C", "z"));

        assert!(reader.unlink(&BookKey::new("b", "Y")));
        assert!(!reader.unlink(&BookKey::new("B", "y")));

        let titles: Vec<_> = reader.borrowed().iter().map(|k| k.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "C"]);
    }
}
