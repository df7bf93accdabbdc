/*!
 * In-Memory Backends
 * Volatile stores for tests and the simulate command
 */

use super::{BackendError, BackendResult, BlobStore, DataStore, Record};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use log::trace;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Fail with `Unavailable` while the store is switched offline
fn check_online(offline: &AtomicBool) -> BackendResult<()> {
    if offline.load(Ordering::Acquire) {
        Err(BackendError::Unavailable("store is offline".to_string()))
    } else {
        Ok(())
    }
}

/// In-memory record store
#[derive(Debug, Default)]
pub struct MemoryDataStore {
    records: RwLock<BTreeMap<String, Record>>,
    offline: AtomicBool,
}

impl MemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every operation fails with `Unavailable`
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Release);
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl DataStore for MemoryDataStore {
    async fn get(&self, key: &str) -> BackendResult<Option<Record>> {
        check_online(&self.offline)?;
        Ok(self.records.read().get(key).cloned())
    }

    async fn put(&self, mut record: Record) -> BackendResult<()> {
        check_online(&self.offline)?;
        let mut records = self.records.write();

        let current = records.get(&record.key).map_or(0, |r| r.version);
        if record.version != 0 && record.version != current {
            return Err(BackendError::Conflict(format!(
                "{} is at version {}, write expected {}",
                record.key, current, record.version
            )));
        }

        record.version = current + 1;
        trace!("put {} (version {})", record.key, record.version);
        records.insert(record.key.clone(), record);
        Ok(())
    }

    async fn delete(&self, key: &str) -> BackendResult<bool> {
        check_online(&self.offline)?;
        Ok(self.records.write().remove(key).is_some())
    }

    fn scan(&self, prefix: &str) -> BoxStream<'static, BackendResult<Record>> {
        if let Err(e) = check_online(&self.offline) {
            return stream::iter(vec![Err(e)]).boxed();
        }

        // Snapshot so the stream does not hold the lock
        let matching: Vec<BackendResult<Record>> = self
            .records
            .read()
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(_, record)| Ok(record.clone()))
            .collect();
        stream::iter(matching).boxed()
    }
}

/// In-memory object store
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
    offline: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every operation fails with `Unavailable`
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Release);
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn read_object(&self, name: &str) -> BackendResult<Vec<u8>> {
        check_online(&self.offline)?;
        self.objects
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(name.to_string()))
    }

    async fn write_object(&self, name: &str, data: Vec<u8>) -> BackendResult<()> {
        check_online(&self.offline)?;
        if name.is_empty() {
            return Err(BackendError::Other("object name is empty".to_string()));
        }
        self.objects.write().insert(name.to_string(), data);
        Ok(())
    }

    async fn object_exists(&self, name: &str) -> BackendResult<bool> {
        check_online(&self.offline)?;
        Ok(self.objects.read().contains_key(name))
    }

    fn list_objects(&self, prefix: &str) -> BoxStream<'static, BackendResult<String>> {
        if let Err(e) = check_online(&self.offline) {
            return stream::iter(vec![Err(e)]).boxed();
        }

        let names: Vec<BackendResult<String>> = self
            .objects
            .read()
            .range(prefix.to_string()..)
            .take_while(|(name, _)| name.starts_with(prefix))
            .map(|(name, _)| Ok(name.clone()))
            .collect();
        stream::iter(names).boxed()
    }
}
