/*!
 * Traced Backends - route every backend call through a Tracer
 * Decorator pattern: same capability in, same capability out
 */

use crate::backend::{BackendResult, BlobStore, DataStore, Record};
use crate::tracer::Tracer;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;

/// Data store whose calls are sampled by a tracer
///
/// Results and errors from the inner store are returned unchanged. The
/// call path is captured when the operation is started, before it is
/// awaited. For `scan`, only establishing the stream is traced.
pub struct TracedDataStore<S: DataStore, T: Tracer> {
    inner: Arc<S>,
    tracer: T,
}

impl<S: DataStore, T: Tracer> TracedDataStore<S, T> {
    pub fn new(inner: S, tracer: T) -> Self {
        Self::from_arc(Arc::new(inner), tracer)
    }

    /// Wrap a store that is also used elsewhere
    pub fn from_arc(inner: Arc<S>, tracer: T) -> Self {
        Self { inner, tracer }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn tracer(&self) -> &T {
        &self.tracer
    }
}

impl<S: DataStore, T: Tracer + Clone> Clone for TracedDataStore<S, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            tracer: self.tracer.clone(),
        }
    }
}

#[async_trait]
impl<S: DataStore, T: Tracer> DataStore for TracedDataStore<S, T> {
    async fn get(&self, key: &str) -> BackendResult<Option<Record>> {
        self.tracer.trace(|| self.inner.get(key)).await
    }

    async fn put(&self, record: Record) -> BackendResult<()> {
        self.tracer.trace(|| self.inner.put(record)).await
    }

    async fn delete(&self, key: &str) -> BackendResult<bool> {
        self.tracer.trace(|| self.inner.delete(key)).await
    }

    fn scan(&self, prefix: &str) -> BoxStream<'static, BackendResult<Record>> {
        self.tracer.trace(|| self.inner.scan(prefix))
    }
}

/// Blob store whose calls are sampled by a tracer
pub struct TracedBlobStore<S: BlobStore, T: Tracer> {
    inner: Arc<S>,
    tracer: T,
}

impl<S: BlobStore, T: Tracer> TracedBlobStore<S, T> {
    pub fn new(inner: S, tracer: T) -> Self {
        Self::from_arc(Arc::new(inner), tracer)
    }

    pub fn from_arc(inner: Arc<S>, tracer: T) -> Self {
        Self { inner, tracer }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn tracer(&self) -> &T {
        &self.tracer
    }
}

impl<S: BlobStore, T: Tracer + Clone> Clone for TracedBlobStore<S, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            tracer: self.tracer.clone(),
        }
    }
}

#[async_trait]
impl<S: BlobStore, T: Tracer> BlobStore for TracedBlobStore<S, T> {
    async fn read_object(&self, name: &str) -> BackendResult<Vec<u8>> {
        self.tracer.trace(|| self.inner.read_object(name)).await
    }

    async fn write_object(&self, name: &str, data: Vec<u8>) -> BackendResult<()> {
        self.tracer.trace(|| self.inner.write_object(name, data)).await
    }

    async fn object_exists(&self, name: &str) -> BackendResult<bool> {
        self.tracer.trace(|| self.inner.object_exists(name)).await
    }

    fn list_objects(&self, prefix: &str) -> BoxStream<'static, BackendResult<String>> {
        self.tracer.trace(|| self.inner.list_objects(prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, MemoryBlobStore, MemoryDataStore};
    use crate::capture::Trace;
    use crate::tracer::{PassThroughTracer, SamplingTracer};
    use futures::TryStreamExt;
    use std::num::NonZeroU32;

    fn sampling() -> Arc<SamplingTracer> {
        Arc::new(SamplingTracer::with_capture(NonZeroU32::new(1).unwrap(), || {
            Trace::from_call_chain(["handler"])
        }))
    }

    #[tokio::test]
    async fn test_results_pass_through() {
        let store = TracedDataStore::new(MemoryDataStore::new(), PassThroughTracer);
        store.put(Record::new("a", "1")).await.unwrap();

        let record = store.get("a").await.unwrap().unwrap();
        assert_eq!(record.value, b"1".to_vec());
        assert_eq!(store.inner().len(), 1);
        assert!(store.delete("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_errors_pass_through() {
        let tracer = sampling();
        let _rx = tracer.subscribe();
        let store = TracedDataStore::new(MemoryDataStore::new(), tracer.clone());
        store.inner().set_offline(true);

        let result = store.get("a").await;
        assert_eq!(
            result,
            Err(BackendError::Unavailable("store is offline".to_string()))
        );
        // Failing calls are still sampled
        assert_eq!(tracer.samples_published(), 1);
    }

    #[tokio::test]
    async fn test_every_call_is_traced() {
        let tracer = sampling();
        let mut rx = tracer.subscribe();
        let store = TracedDataStore::new(MemoryDataStore::new(), tracer.clone());

        store.put(Record::new("k:1", "x")).await.unwrap();
        store.get("k:1").await.unwrap();
        let scanned: Vec<Record> = store.scan("k:").try_collect().await.unwrap();
        store.delete("k:1").await.unwrap();

        assert_eq!(scanned.len(), 1);
        // Stream establishment counts once, not once per item
        assert_eq!(tracer.samples_published(), 4);
        assert_eq!(rx.try_recv().unwrap().frames()[0].function, "handler");
    }

    #[tokio::test]
    async fn test_traced_blob_store() {
        let tracer = sampling();
        let _rx = tracer.subscribe();
        let store = TracedBlobStore::new(MemoryBlobStore::new(), tracer.clone());

        store.write_object("a/1", b"data".to_vec()).await.unwrap();
        assert!(store.object_exists("a/1").await.unwrap());
        assert_eq!(store.read_object("a/1").await.unwrap(), b"data".to_vec());
        assert!(matches!(
            store.read_object("a/2").await,
            Err(BackendError::NotFound(_))
        ));
        let names: Vec<String> = store.list_objects("a/").try_collect().await.unwrap();

        assert_eq!(names, vec!["a/1"]);
        assert_eq!(tracer.samples_published(), 5);
    }

    #[tokio::test]
    async fn test_clones_share_inner_store() {
        let store = TracedBlobStore::new(MemoryBlobStore::new(), Arc::new(PassThroughTracer));
        let other = store.clone();

        store.write_object("shared", vec![1]).await.unwrap();
        assert!(other.object_exists("shared").await.unwrap());
    }
}
