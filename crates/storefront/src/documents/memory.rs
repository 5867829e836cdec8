//! In-process document store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use atelier_core::UserId;

use super::{Collection, Document, DocumentError, DocumentStore, merge_into};

/// Document store backed by a `HashMap`.
///
/// Counts reads and writes and can be switched offline, which makes it the
/// fake of choice for exercising the store's persistence paths.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<(Collection, UserId), Document>>,
    offline: AtomicBool,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with [`DocumentError::Unavailable`]
    /// (`true`) or succeed again (`false`).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of `get` calls that reached the store.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of successful `set_merge` calls.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Peek at a stored document without counting a read.
    pub async fn snapshot(&self, collection: Collection, key: &UserId) -> Option<Document> {
        self.documents
            .read()
            .await
            .get(&(collection, key.clone()))
            .cloned()
    }

    fn check_online(&self) -> Result<(), DocumentError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(DocumentError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(
        &self,
        collection: Collection,
        key: &UserId,
    ) -> Result<Option<Document>, DocumentError> {
        self.check_online()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .documents
            .read()
            .await
            .get(&(collection, key.clone()))
            .cloned())
    }

    async fn set_merge(
        &self,
        collection: Collection,
        key: &UserId,
        document: Document,
    ) -> Result<(), DocumentError> {
        self.check_online()?;
        let mut documents = self.documents.write().await;
        merge_into(
            documents.entry((collection, key.clone())).or_default(),
            document,
        );
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
