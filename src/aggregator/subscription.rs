/*!
 * Aggregator Subscription - background task folding a trace channel
 * into a shared TraceAggregator
 */

use super::collector::TraceAggregator;
use crate::capture::Trace;
use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};

/// Handle to a running fold task
///
/// The task ends when the tracer closes its channel or when `close` is
/// called. Either way every trace already buffered is folded first.
/// Dropping the handle leaves the task running until the channel ends.
#[derive(Debug)]
pub struct AggregatorSubscription {
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<u64>,
}

impl AggregatorSubscription {
    pub(crate) fn spawn(
        aggregator: Arc<TraceAggregator>,
        receiver: broadcast::Receiver<Trace>,
    ) -> Self {
        let (stop, stopped) = oneshot::channel();
        let handle = tokio::spawn(fold_loop(aggregator, receiver, stopped));
        Self {
            stop: Some(stop),
            handle,
        }
    }

    /// Stop intake, fold what is buffered, and wait for the task
    ///
    /// Returns the number of traces this subscription folded.
    pub async fn close(mut self) -> Result<u64, JoinError> {
        if let Some(stop) = self.stop.take() {
            // Err means the task already finished on its own
            let _ = stop.send(());
        }
        self.handle.await
    }

    /// Wait for the channel to end on its own
    pub async fn join(self) -> Result<u64, JoinError> {
        self.handle.await
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

async fn fold_loop(
    aggregator: Arc<TraceAggregator>,
    mut receiver: broadcast::Receiver<Trace>,
    mut stopped: oneshot::Receiver<()>,
) -> u64 {
    let mut folded = 0u64;
    let mut stop_armed = true;

    loop {
        tokio::select! {
            biased;

            received = receiver.recv() => match received {
                Ok(trace) => {
                    aggregator.add_trace(&trace);
                    folded += 1;
                }
                Err(RecvError::Lagged(lost)) => {
                    warn!("Aggregator lagged behind tracer, {} trace(s) lost", lost);
                }
                Err(RecvError::Closed) => {
                    debug!("Trace channel closed after {} folded trace(s)", folded);
                    return folded;
                }
            },

            stop = &mut stopped, if stop_armed => match stop {
                Ok(()) => break,
                // Handle dropped without close: run until the channel ends
                Err(_) => stop_armed = false,
            },
        }
    }

    // Stop requested: fold the backlog, then detach
    loop {
        match receiver.try_recv() {
            Ok(trace) => {
                aggregator.add_trace(&trace);
                folded += 1;
            }
            Err(TryRecvError::Lagged(lost)) => {
                warn!("Aggregator lagged behind tracer, {} trace(s) lost", lost);
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }

    debug!("Aggregator subscription closed after {} folded trace(s)", folded);
    folded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::KeepAllFrames;
    use crate::tracer::{SamplingTracer, Tracer};
    use std::num::NonZeroU32;

    fn tracer(rate: u32) -> SamplingTracer {
        SamplingTracer::with_capture(NonZeroU32::new(rate).unwrap(), || {
            Trace::from_call_chain(["main", "get"])
        })
    }

    #[tokio::test]
    async fn test_close_drains_buffered_traces() {
        let aggregator = Arc::new(TraceAggregator::new(KeepAllFrames));
        let tracer = tracer(1);
        let subscription = aggregator.subscribe(&tracer);

        for _ in 0..50 {
            tracer.trace(|| ());
        }

        let folded = subscription.close().await.unwrap();
        assert_eq!(folded, 50);
        assert_eq!(aggregator.total_samples(), 50);
    }

    #[tokio::test]
    async fn test_join_ends_with_tracer() {
        let aggregator = Arc::new(TraceAggregator::new(KeepAllFrames));
        let tracer = tracer(2);
        let subscription = aggregator.subscribe(&tracer);

        for _ in 0..10 {
            tracer.trace(|| ());
        }
        tracer.close();

        assert_eq!(subscription.join().await.unwrap(), 5);
        assert_eq!(aggregator.total_samples(), 5);
    }

    #[tokio::test]
    async fn test_closed_subscription_stops_sampling() {
        let aggregator = Arc::new(TraceAggregator::new(KeepAllFrames));
        let tracer = tracer(1);
        let subscription = aggregator.subscribe(&tracer);
        assert_eq!(tracer.subscriber_count(), 1);

        subscription.close().await.unwrap();
        assert_eq!(tracer.subscriber_count(), 0);

        tracer.trace(|| ());
        assert_eq!(tracer.samples_published(), 0);
    }

    #[tokio::test]
    async fn test_lagged_receiver_keeps_folding() {
        let aggregator = Arc::new(TraceAggregator::new(KeepAllFrames));
        let tracer = SamplingTracer::with_capacity(NonZeroU32::new(1).unwrap(), 4);
        let receiver = tracer.subscribe();

        // Overflow the channel before the task starts reading
        for _ in 0..10 {
            tracer.trace(|| ());
        }
        let subscription = aggregator.attach(receiver);
        tracer.close();

        let folded = subscription.join().await.unwrap();
        assert_eq!(folded, 4);
        assert_eq!(aggregator.total_samples(), 4);
    }
}
