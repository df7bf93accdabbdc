//! Instrumented proxies for backend capabilities.
//!
//! A proxy implements the same trait as the backend it wraps and forwards
//! every call through a `Tracer`. Callers swap a backend for its proxy
//! without any other change.

pub mod traced;

pub use traced::{TracedBlobStore, TracedDataStore};
