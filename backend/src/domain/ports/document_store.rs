//! Port for typed document persistence.
//!
//! A [`DocumentStore`] manages one collection of documents of type `T`, each
//! addressed by a string id. Implementations must be safe to share across
//! concurrent requests without external locking.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::define_port_error;

define_port_error! {
    /// Errors raised by document store adapters.
    pub enum DocumentStoreError {
        /// No document with the requested id exists.
        NotFound { id: String } => "document {id} not found",
        /// A document with the same id already exists.
        Conflict { id: String } => "document {id} already exists",
        /// The backing database cannot be reached or the store was closed.
        Unavailable { message: String } => "document store unavailable: {message}",
        /// The operation reached the database but failed.
        Query { message: String } => "document store query failed: {message}",
    }
}

/// CRUD access to a collection of `T` documents.
#[async_trait]
pub trait DocumentStore<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    /// Insert `document` under `id`.
    async fn create_document(&self, id: &str, document: &T) -> Result<(), DocumentStoreError>;

    /// Load the document stored under `id`.
    async fn find_document(&self, id: &str) -> Result<T, DocumentStoreError>;

    /// Replace the document stored under `id`.
    async fn update_document(&self, id: &str, document: &T) -> Result<(), DocumentStoreError>;

    /// Remove the document stored under `id`.
    async fn delete_document(&self, id: &str) -> Result<(), DocumentStoreError>;

    /// Load every document in the collection.
    async fn list_documents(&self) -> Result<Vec<T>, DocumentStoreError>;

    /// Release the underlying connection. Calling it again is a no-op.
    async fn disconnect(&self);
}

/// Process-local store used by tests and database-free local runs.
#[derive(Debug)]
pub struct InMemoryDocumentStore<T> {
    documents: RwLock<HashMap<String, T>>,
    closed: AtomicBool,
}

impl<T> Default for InMemoryDocumentStore<T> {
    fn default() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }
}

impl<T> InMemoryDocumentStore<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> Result<(), DocumentStoreError> {
        if self.closed.load(Ordering::Acquire) {
            Err(DocumentStoreError::unavailable("store disconnected"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl<T> DocumentStore<T> for InMemoryDocumentStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn create_document(&self, id: &str, document: &T) -> Result<(), DocumentStoreError> {
        self.ensure_open()?;
        let mut documents = self.documents.write().await;
        if documents.contains_key(id) {
            return Err(DocumentStoreError::conflict(id));
        }
        documents.insert(id.to_owned(), document.clone());
        Ok(())
    }

    async fn find_document(&self, id: &str) -> Result<T, DocumentStoreError> {
        self.ensure_open()?;
        self.documents
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| DocumentStoreError::not_found(id))
    }

    async fn update_document(&self, id: &str, document: &T) -> Result<(), DocumentStoreError> {
        self.ensure_open()?;
        match self.documents.write().await.get_mut(id) {
            Some(stored) => {
                *stored = document.clone();
                Ok(())
            }
            None => Err(DocumentStoreError::not_found(id)),
        }
    }

    async fn delete_document(&self, id: &str) -> Result<(), DocumentStoreError> {
        self.ensure_open()?;
        self.documents
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DocumentStoreError::not_found(id))
    }

    async fn list_documents(&self) -> Result<Vec<T>, DocumentStoreError> {
        self.ensure_open()?;
        Ok(self.documents.read().await.values().cloned().collect())
    }

    async fn disconnect(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
