//! Tracers: deciding per call whether to capture a call path.
//!
//! This module provides:
//! - The `Tracer` capability
//! - `PassThroughTracer` (never samples)
//! - `SamplingTracer` (samples one call in R while someone is subscribed)
//! - `ConfiguredTracer` (either of the above, picked from configuration)
//!
//! A tracer never alters the operation it wraps: the closure runs exactly
//! once and its result, including any error, is returned as is. For async
//! operations the closure builds the future, so the call path is captured
//! before the operation starts.

pub mod broadcaster;
pub mod sampling;

pub use broadcaster::TraceBroadcaster;
pub use sampling::SamplingTracer;

use crate::capture::Trace;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Executes operations, possibly sampling their call path
pub trait Tracer: Send + Sync {
    /// Run `op` and return its result unchanged
    fn trace<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R;
}

impl<T: Tracer> Tracer for Arc<T> {
    fn trace<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R,
    {
        (**self).trace(op)
    }
}

impl<T: Tracer> Tracer for &T {
    fn trace<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R,
    {
        (**self).trace(op)
    }
}

/// Tracer used when nobody observes traces
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughTracer;

impl Tracer for PassThroughTracer {
    #[inline]
    fn trace<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R,
    {
        op()
    }
}

/// Tracer variant selected at startup
#[derive(Debug)]
pub enum ConfiguredTracer {
    PassThrough(PassThroughTracer),
    Sampling(SamplingTracer),
}

impl ConfiguredTracer {
    /// The sampling tracer, if tracing is enabled
    pub fn as_sampling(&self) -> Option<&SamplingTracer> {
        match self {
            ConfiguredTracer::Sampling(tracer) => Some(tracer),
            ConfiguredTracer::PassThrough(_) => None,
        }
    }

    /// Subscribe to sampled traces
    ///
    /// A pass-through tracer has nothing to publish; its receiver reports
    /// end-of-stream immediately.
    pub fn subscribe(&self) -> broadcast::Receiver<Trace> {
        match self {
            ConfiguredTracer::Sampling(tracer) => tracer.subscribe(),
            ConfiguredTracer::PassThrough(_) => broadcast::channel(1).1,
        }
    }

    pub fn close(&self) {
        if let ConfiguredTracer::Sampling(tracer) = self {
            tracer.close();
        }
    }
}

impl Tracer for ConfiguredTracer {
    fn trace<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R,
    {
        match self {
            ConfiguredTracer::PassThrough(tracer) => tracer.trace(op),
            ConfiguredTracer::Sampling(tracer) => tracer.trace(op),
        }
    }
}

impl From<SamplingTracer> for ConfiguredTracer {
    fn from(tracer: SamplingTracer) -> Self {
        ConfiguredTracer::Sampling(tracer)
    }
}

impl From<PassThroughTracer> for ConfiguredTracer {
    fn from(tracer: PassThroughTracer) -> Self {
        ConfiguredTracer::PassThrough(tracer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroU32;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn test_pass_through_returns_result() {
        assert_eq!(PassThroughTracer.trace(|| "value"), "value");
        let err: Result<(), &str> = PassThroughTracer.trace(|| Err("failed"));
        assert_eq!(err, Err("failed"));
    }

    #[test]
    fn test_pass_through_subscribe_is_closed() {
        let tracer = ConfiguredTracer::from(PassThroughTracer);
        let mut rx = tracer.subscribe();
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Closed)));
        assert!(tracer.as_sampling().is_none());
    }

    #[test]
    fn test_configured_sampling_delegates() {
        let tracer = ConfiguredTracer::from(SamplingTracer::with_capture(
            NonZeroU32::new(2).unwrap(),
            || Trace::from_call_chain(["main"]),
        ));
        let mut rx = tracer.subscribe();

        for _ in 0..4 {
            tracer.trace(|| ());
        }

        assert_eq!(tracer.as_sampling().map(|t| t.samples_published()), Some(2));
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        tracer.close();
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Closed)));
    }

    #[test]
    fn test_shared_tracer_through_arc() {
        let tracer = Arc::new(PassThroughTracer);
        assert_eq!(tracer.trace(|| 7), 7);
        assert_eq!((&PassThroughTracer).trace(|| 8), 8);
    }
}
