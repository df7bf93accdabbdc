/*!
 * Backend Contracts
 * Async storage capabilities that the traced proxies decorate
 */

pub mod memory;

pub use memory::{MemoryBlobStore, MemoryDataStore};

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by a backend
///
/// Proxies hand these back to the caller untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Backend error: {0}")]
    Other(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// A keyed record in a data store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub key: String,
    pub value: Vec<u8>,

    /// Version the writer last saw; 0 writes unconditionally.
    /// Stores return the version they hold.
    #[serde(default)]
    pub version: u64,
}

impl Record {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            version: 0,
        }
    }

    /// Write only if the stored version still equals `version`
    pub fn expecting(mut self, version: u64) -> Self {
        self.version = version;
        self
    }
}

/// Key/value record storage
///
/// Single-result operations are async; `scan` yields a lazy sequence.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Fetch a record by key
    async fn get(&self, key: &str) -> BackendResult<Option<Record>>;

    /// Insert or replace a record
    ///
    /// Fails with `Conflict` if `record.version` is non-zero and differs
    /// from the stored version.
    async fn put(&self, record: Record) -> BackendResult<()>;

    /// Remove a record; true if it existed
    async fn delete(&self, key: &str) -> BackendResult<bool>;

    /// Stream every record whose key starts with `prefix`, in key order
    fn scan(&self, prefix: &str) -> BoxStream<'static, BackendResult<Record>>;
}

/// Named binary object storage
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read an object's contents
    async fn read_object(&self, name: &str) -> BackendResult<Vec<u8>>;

    /// Create or overwrite an object
    async fn write_object(&self, name: &str, data: Vec<u8>) -> BackendResult<()>;

    async fn object_exists(&self, name: &str) -> BackendResult<bool>;

    /// Stream object names starting with `prefix`, in name order
    fn list_objects(&self, prefix: &str) -> BoxStream<'static, BackendResult<String>>;
}
