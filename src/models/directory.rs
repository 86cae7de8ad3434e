//! Reader directory: the ordered collection of registered readers

use std::collections::HashMap;

use super::{book::fold, reader::Reader, ModelError};

#[derive(Debug, Clone, Default)]
pub struct ReaderDirectory {
    readers: Vec<Reader>,
    index: HashMap<String, usize>,
}

impl ReaderDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from stored readers, rejecting duplicate names
    pub fn from_readers(readers: Vec<Reader>) -> Result<Self, ModelError> {
        let mut directory = Self::new();
        for reader in readers {
            directory.insert(reader)?;
        }
        Ok(directory)
    }

    pub fn readers(&self) -> &[Reader] {
        &self.readers
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Reader> {
        self.readers.iter()
    }

    pub fn len(&self) -> usize {
        self.readers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&fold(name))
    }

    pub fn get(&self, name: &str) -> Option<&Reader> {
        self.index.get(&fold(name)).map(|&i| &self.readers[i])
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Reader> {
        match self.index.get(&fold(name)) {
            Some(&i) => Some(&mut self.readers[i]),
            None => None,
        }
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Reader> {
        self.readers.iter_mut()
    }

    pub(crate) fn insert(&mut self, reader: Reader) -> Result<&mut Reader, ModelError> {
        let folded = fold(reader.name());
        if self.index.contains_key(&folded) {
            return Err(ModelError::DuplicateReader(reader.name().to_string()));
        }
        let pos = self.readers.len();
        self.index.insert(folded, pos);
        self.readers.push(reader);
        Ok(&mut self.readers[pos])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_name_rejected() {
        let mut directory = ReaderDirectory::new();
        directory.insert(Reader::new("Ann")).unwrap();
        let err = directory.insert(Reader::new("ann")).unwrap_err();
        assert_eq!(err, ModelError::DuplicateReader("ann".to_string()));
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn test_get_by_any_case() {
        let directory =
            ReaderDirectory::from_readers(vec![Reader::new("Alice"), Reader::new("Bob")]).unwrap();
        assert_eq!(directory.get("BOB").map(Reader::name), Some("Bob"));
        assert!(directory.contains("alice"));
        assert!(directory.get("Carol").is_none());
    }
}
