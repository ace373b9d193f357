//! Lookup of open documents by title.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use log::debug;

use crate::store::{DocumentStore, StoreError};

/// Source of open documents for resolving lazy `(document, path)` references
pub trait DocumentRegistry {
    /// The open document with `title`
    fn get_document(&self, title: &str) -> Option<DocumentStore>;
}

/// Registry of the documents open in this session.
///
/// Cloning is cheap; clones share the same set of documents.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    documents: Rc<RefCell<BTreeMap<String, DocumentStore>>>,
}

impl Environment {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `store` under its title, replacing any document with the same title
    pub fn add(&self, store: DocumentStore) -> Option<DocumentStore> {
        debug!("Registering document `{}`", store.title());
        self.documents
            .borrow_mut()
            .insert(store.title().to_string(), store)
    }

    /// Open (or create) the document at `path` and register it
    pub fn open(&self, path: impl AsRef<Path>) -> Result<DocumentStore, StoreError> {
        let store = DocumentStore::open(path, None)?;
        self.add(store.clone());
        Ok(store)
    }

    /// Unregister and close the document with `title`
    pub fn remove(&self, title: &str) -> Option<DocumentStore> {
        let store = self.documents.borrow_mut().remove(title)?;
        store.close();
        Some(store)
    }

    /// Titles of the registered documents
    pub fn titles(&self) -> Vec<String> {
        self.documents.borrow().keys().cloned().collect()
    }

    /// Whether a document with `title` is registered
    pub fn contains(&self, title: &str) -> bool {
        self.documents.borrow().contains_key(title)
    }

    /// Number of registered documents
    pub fn len(&self) -> usize {
        self.documents.borrow().len()
    }

    /// Whether no document is registered
    pub fn is_empty(&self) -> bool {
        self.documents.borrow().is_empty()
    }

    /// Close and unregister every document
    pub fn close_all(&self) {
        for (_, store) in std::mem::take(&mut *self.documents.borrow_mut()) {
            store.close();
        }
    }
}

impl DocumentRegistry for Environment {
    fn get_document(&self, title: &str) -> Option<DocumentStore> {
        self.documents
            .borrow()
            .get(title)
            .filter(|store| store.is_open())
            .cloned()
    }
}
