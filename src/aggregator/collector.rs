//! Process-wide trace aggregation.
//!
//! `TraceAggregator` owns two call trees over the same samples:
//! - `topDown`: paths folded outermost frame first (who calls what)
//! - `bottomUp`: paths folded innermost frame first (what is called from where)
//!
//! It is created once by the composition root, shared through an `Arc` and
//! lives as long as the process. Traces arrive either directly through
//! `add_trace` or from a tracer's channel via `subscribe`.

use super::metrics::{calculate_hot_paths, calculate_tree_stats, HotPath, TreeStats};
use super::subscription::AggregatorSubscription;
use super::summary::TraceSummary;
use super::tree::TraceTreeNode;
use crate::capture::{FrameClassifier, RuntimeFrameClassifier, Trace};
use crate::tracer::SamplingTracer;
use crate::utils::config::{BOTTOM_UP_ROOT, TOP_DOWN_ROOT};
use log::debug;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Folds sampled traces into top-down and bottom-up call trees
pub struct TraceAggregator {
    top_down: Mutex<TraceTreeNode>,
    bottom_up: Mutex<TraceTreeNode>,
    classifier: Box<dyn FrameClassifier>,
}

impl TraceAggregator {
    /// Create an aggregator filtering frames with `classifier`
    pub fn new(classifier: impl FrameClassifier + 'static) -> Self {
        Self {
            top_down: Mutex::new(TraceTreeNode::new(TOP_DOWN_ROOT)),
            bottom_up: Mutex::new(TraceTreeNode::new(BOTTOM_UP_ROOT)),
            classifier: Box::new(classifier),
        }
    }

    /// Fold one trace into both trees
    ///
    /// Both locks are held for the whole fold, always taken top-down first,
    /// so concurrent folds and summaries never observe half a trace.
    pub fn add_trace(&self, trace: &Trace) {
        let mut top_down = self.top_down.lock();
        let mut bottom_up = self.bottom_up.lock();

        top_down.add_trace(trace.outermost_first(), self.classifier.as_ref());
        bottom_up.add_trace(trace.innermost_first(), self.classifier.as_ref());
    }

    /// Snapshot both trees as a summary document
    ///
    /// # Arguments
    /// * `complete` - Emit every node instead of pruning children below 1%
    ///   of their parent
    pub fn summary(&self, complete: bool) -> TraceSummary {
        let top_down = self.top_down.lock();
        let bottom_up = self.bottom_up.lock();

        TraceSummary::new(
            top_down.as_sorted_map(complete),
            bottom_up.as_sorted_map(complete),
        )
    }

    /// Number of traces folded so far
    pub fn total_samples(&self) -> u64 {
        self.top_down.lock().counter()
    }

    /// Most frequent call paths in the top-down tree
    pub fn hot_paths(&self, top_n: usize) -> Vec<HotPath> {
        calculate_hot_paths(&self.top_down.lock(), top_n)
    }

    pub fn stats(&self) -> TreeStats {
        calculate_tree_stats(&self.top_down.lock())
    }

    /// Copy of the top-down tree
    pub fn top_down(&self) -> TraceTreeNode {
        self.top_down.lock().clone()
    }

    /// Copy of the bottom-up tree
    pub fn bottom_up(&self) -> TraceTreeNode {
        self.bottom_up.lock().clone()
    }

    /// Start folding every trace `tracer` publishes
    ///
    /// Must be called from within a Tokio runtime. Sampling begins as soon
    /// as this returns, since the subscription counts as a subscriber.
    pub fn subscribe(self: &Arc<Self>, tracer: &SamplingTracer) -> AggregatorSubscription {
        debug!("Subscribing aggregator to tracer (rate 1/{})", tracer.rate());
        self.attach(tracer.subscribe())
    }

    /// Start folding every trace received on `receiver`
    pub fn attach(self: &Arc<Self>, receiver: broadcast::Receiver<Trace>) -> AggregatorSubscription {
        AggregatorSubscription::spawn(Arc::clone(self), receiver)
    }
}

impl Default for TraceAggregator {
    fn default() -> Self {
        Self::new(RuntimeFrameClassifier::default())
    }
}

impl fmt::Debug for TraceAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceAggregator")
            .field("total_samples", &self.total_samples())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{Frame, KeepAllFrames};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_add_trace_builds_both_trees() {
        let aggregator = TraceAggregator::new(KeepAllFrames);
        aggregator.add_trace(&Trace::from_call_chain(["main", "load", "get"]));

        let top_down = aggregator.top_down();
        assert!(top_down
            .child("main")
            .and_then(|n| n.child("load"))
            .and_then(|n| n.child("get"))
            .is_some());

        let bottom_up = aggregator.bottom_up();
        assert!(bottom_up
            .child("get")
            .and_then(|n| n.child("load"))
            .and_then(|n| n.child("main"))
            .is_some());

        assert_eq!(aggregator.total_samples(), 1);
    }

    #[test]
    fn test_empty_summary() {
        let aggregator = TraceAggregator::default();
        let json = serde_json::to_string(&aggregator.summary(false)).unwrap();
        assert_eq!(json, r#"{"topDown":0,"bottomUp":0}"#);
    }

    #[test]
    fn test_summary_counts_match_in_both_directions() {
        let aggregator = TraceAggregator::new(KeepAllFrames);
        aggregator.add_trace(&Trace::from_call_chain(["a", "b"]));
        aggregator.add_trace(&Trace::from_call_chain(["a", "c"]));

        let summary = aggregator.summary(true);
        assert_eq!(summary.top_down_samples(), 2);
        assert_eq!(summary.bottom_up_samples(), 2);

        let json = serde_json::to_string(&summary).unwrap();
        assert_eq!(
            json,
            r#"{"[2] topDown":{"[2] a":{"b":1,"c":1}},"[2] bottomUp":{"[1] b":{"a":1},"[1] c":{"a":1}}}"#
        );
    }

    #[test]
    fn test_classifier_filters_frames() {
        let aggregator =
            TraceAggregator::new(|frame: &Frame| frame.function.starts_with("runtime::"));
        aggregator.add_trace(&Trace::from_call_chain(["app::main", "runtime::poll", "app::get"]));

        let top_down = aggregator.top_down();
        assert!(top_down
            .child("app::main")
            .and_then(|n| n.child("app::get"))
            .is_some());
    }

    #[test]
    fn test_concurrent_folds_are_counted() {
        let aggregator = Arc::new(TraceAggregator::new(KeepAllFrames));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let aggregator = aggregator.clone();
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        aggregator.add_trace(&Trace::from_call_chain(["main".to_string(), format!("worker-{}", i)]));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(aggregator.total_samples(), 1000);
        assert_eq!(aggregator.bottom_up().counter(), 1000);
        assert_eq!(aggregator.top_down().child("main").unwrap().counter(), 1000);
        assert_eq!(aggregator.hot_paths(10).len(), 4);
    }
}
