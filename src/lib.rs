//! Callpath Trace
//!
//! Sampled call-path tracing for storage backends.
//!
//! Wrap a backend in a traced proxy; every call goes through a `Tracer`
//! which, while someone is subscribed, captures the caller's stack on one
//! call in R. A `TraceAggregator` folds those stacks into top-down and
//! bottom-up call trees and summarizes them as a pruned, sorted document.
//!
//! ## Getting Started
//!
//! ```ignore
//! let tracer = Arc::new(TracerConfig::from_env()?.build_tracer());
//! let aggregator = Arc::new(TraceAggregator::default());
//! let subscription = tracer.as_sampling().map(|t| aggregator.subscribe(t));
//!
//! let store = TracedDataStore::new(MemoryDataStore::new(), tracer.clone());
//! store.get("user:1").await?;
//!
//! println!("{}", aggregator.summary(false).render_text());
//! ```

pub mod aggregator;
pub mod backend;
pub mod capture;
pub mod output;
pub mod proxy;
pub mod tracer;
pub mod utils;
