//! In-memory reference implementations of the store collaborators, backed
//! by DashMap. Documents are held as serialized JSON so that get/query
//! genuinely exercise the serialization contract.

use std::marker::PhantomData;

use dashmap::DashMap;
use tracing::debug;

use affiliate_core::error::{AffiliateError, AffiliateResult};

use crate::{Document, DocumentStore, FileStore, Filter};
use async_trait::async_trait;

/// Keyed in-memory document collection.
pub struct MemoryDocumentStore<T: Document> {
    docs: DashMap<String, serde_json::Value>,
    _marker: PhantomData<T>,
}

impl<T: Document> MemoryDocumentStore<T> {
    pub fn new() -> Self {
        Self {
            docs: DashMap::new(),
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

impl<T: Document> Default for MemoryDocumentStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Document + 'static> DocumentStore<T> for MemoryDocumentStore<T> {
    async fn get(&self, id: &str) -> AffiliateResult<Option<T>> {
        match self.docs.get(id) {
            Some(doc) => Ok(Some(serde_json::from_value(doc.clone())?)),
            None => Ok(None),
        }
    }

    async fn get_all(&self) -> AffiliateResult<Vec<T>> {
        let mut entries: Vec<(String, serde_json::Value)> = self
            .docs
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        // Stable output order by key.
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        entries
            .into_iter()
            .map(|(_, doc)| serde_json::from_value(doc).map_err(AffiliateError::from))
            .collect()
    }

    async fn query(&self, filter: Filter<T>) -> AffiliateResult<Vec<T>> {
        let all = self.get_all().await?;
        Ok(all.into_iter().filter(|record| filter(record)).collect())
    }

    async fn set(&self, record: &T) -> AffiliateResult<()> {
        let doc = serde_json::to_value(record)?;
        self.docs.insert(record.doc_id(), doc);
        Ok(())
    }

    async fn create_bulk(&self, records: &[T]) -> AffiliateResult<()> {
        // Serialize and check ids up front so a bad record fails the whole
        // batch before anything is written.
        let mut prepared = Vec::with_capacity(records.len());
        for record in records {
            let id = record.doc_id();
            if self.docs.contains_key(&id) || prepared.iter().any(|(pid, _)| *pid == id) {
                return Err(AffiliateError::Storage(format!(
                    "duplicate document id {id}"
                )));
            }
            prepared.push((id, serde_json::to_value(record)?));
        }

        let count = prepared.len();
        for (id, doc) in prepared {
            self.docs.insert(id, doc);
        }
        debug!(count, "bulk create committed");
        Ok(())
    }

    async fn remove(&self, id: &str) -> AffiliateResult<()> {
        self.docs.remove(id);
        Ok(())
    }
}

/// In-memory attachment storage returning `mem://` URLs.
pub struct MemoryFileStore {
    files: DashMap<String, Vec<u8>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self {
            files: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Default for MemoryFileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn upload(&self, path: &str, contents: Vec<u8>) -> AffiliateResult<String> {
        self.files.insert(path.to_string(), contents);
        Ok(format!("mem://{path}"))
    }
}
