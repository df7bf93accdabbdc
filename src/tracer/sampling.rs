//! Rate-based sampling tracer.
//!
//! Every traced call first checks whether anyone is subscribed. Only then is
//! the decimation counter stepped; the call that brings it to zero captures
//! the current call path, publishes it and rearms the counter. With rate R
//! and a subscriber attached throughout, calls R, 2R, 3R, ... are sampled.

use super::broadcaster::TraceBroadcaster;
use super::Tracer;
use crate::capture::{BacktraceCapture, StackCapture, Trace};
use crate::utils::config::DEFAULT_CHANNEL_CAPACITY;
use log::trace;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tokio::sync::broadcast;

/// Tracer that samples one call in `rate`
pub struct SamplingTracer {
    rate: NonZeroU32,

    /// Calls left until the next sample; always in `1..=rate`
    countdown: AtomicU32,

    broadcaster: TraceBroadcaster,

    capture: Box<dyn StackCapture>,

    published: AtomicU64,
}

impl SamplingTracer {
    /// Sampling tracer capturing real stacks
    pub fn new(rate: NonZeroU32) -> Self {
        Self::with_capacity(rate, DEFAULT_CHANNEL_CAPACITY)
    }

    /// Sampling tracer with a custom channel capacity
    pub fn with_capacity(rate: NonZeroU32, capacity: usize) -> Self {
        Self::build(rate, capacity, Box::new(BacktraceCapture::default()))
    }

    /// Sampling tracer using a custom capture source
    pub fn with_capture(rate: NonZeroU32, capture: impl StackCapture + 'static) -> Self {
        Self::build(rate, DEFAULT_CHANNEL_CAPACITY, Box::new(capture))
    }

    fn build(rate: NonZeroU32, capacity: usize, capture: Box<dyn StackCapture>) -> Self {
        Self {
            rate,
            countdown: AtomicU32::new(rate.get()),
            broadcaster: TraceBroadcaster::new(capacity),
            capture,
            published: AtomicU64::new(0),
        }
    }

    pub fn rate(&self) -> u32 {
        self.rate.get()
    }

    /// Subscribe to sampled traces
    ///
    /// Sampling only happens while at least one receiver is alive.
    pub fn subscribe(&self) -> broadcast::Receiver<Trace> {
        self.broadcaster.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.broadcaster.subscriber_count()
    }

    /// Total number of traces captured and published so far
    pub fn samples_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// End the trace channel
    ///
    /// Subscribers drain what is buffered and then see end-of-stream.
    /// Further calls are still executed, just never sampled.
    pub fn close(&self) {
        self.broadcaster.close();
    }

    pub fn is_closed(&self) -> bool {
        self.broadcaster.is_closed()
    }

    /// Step the decimation counter; true if this call is selected
    ///
    /// A single read-modify-write keeps the cadence exact when the tracer
    /// is shared between threads.
    fn select(&self) -> bool {
        let rate = self.rate.get();
        let previous = self
            .countdown
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| {
                Some(if left <= 1 { rate } else { left - 1 })
            })
            .unwrap_or_else(|left| left);
        previous <= 1
    }

    #[inline(never)]
    fn sample(&self) {
        let trace = self.capture.capture();
        let delivered = self.broadcaster.publish(trace);
        self.published.fetch_add(1, Ordering::Relaxed);
        trace!("Published sampled trace to {} subscriber(s)", delivered);
    }
}

impl Tracer for SamplingTracer {
    fn trace<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R,
    {
        if self.broadcaster.has_subscribers() && self.select() {
            self.sample();
        }
        op()
    }
}

impl fmt::Debug for SamplingTracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SamplingTracer")
            .field("rate", &self.rate)
            .field("countdown", &self.countdown.load(Ordering::Relaxed))
            .field("subscribers", &self.subscriber_count())
            .field("published", &self.samples_published())
            .finish()
    }
}
