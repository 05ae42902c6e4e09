//! Persistence collaborators for the back office. The core computes
//! deterministic document ids; stores never assign their own keys.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use affiliate_core::error::AffiliateResult;
use affiliate_core::types::{Client, CompensationGroup, Conversion, Payout, UnassignedConversion};

pub mod memory;

pub use memory::{MemoryDocumentStore, MemoryFileStore};

/// A persistable record with a deterministic document id.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync {
    fn doc_id(&self) -> String;
}

/// Boxed predicate for [`DocumentStore::query`].
pub type Filter<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Keyed document persistence. Implementations serialize through serde,
/// so every read round-trips the serialization contract.
#[async_trait]
pub trait DocumentStore<T: Document>: Send + Sync {
    async fn get(&self, id: &str) -> AffiliateResult<Option<T>>;
    async fn get_all(&self) -> AffiliateResult<Vec<T>>;
    async fn query(&self, filter: Filter<T>) -> AffiliateResult<Vec<T>>;
    async fn set(&self, record: &T) -> AffiliateResult<()>;
    /// Insert a batch all-or-nothing: any invalid or duplicate id fails
    /// the whole call before a single record is written.
    async fn create_bulk(&self, records: &[T]) -> AffiliateResult<()>;
    async fn remove(&self, id: &str) -> AffiliateResult<()>;
}

/// Durable attachment storage; uploads return a stable URL.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn upload(&self, path: &str, contents: Vec<u8>) -> AffiliateResult<String>;
}

impl Document for Conversion {
    fn doc_id(&self) -> String {
        self.id()
    }
}

impl Document for UnassignedConversion {
    fn doc_id(&self) -> String {
        self.id()
    }
}

impl Document for Client {
    fn doc_id(&self) -> String {
        self.id.clone()
    }
}

impl Document for CompensationGroup {
    fn doc_id(&self) -> String {
        self.id.clone()
    }
}

impl Document for Payout {
    fn doc_id(&self) -> String {
        self.id.to_string()
    }
}
