//! Aggregation of sampled traces into call trees and summaries.
//!
//! This module turns a stream of traces into:
//! - Top-down and bottom-up call trees (`TraceTreeNode`)
//! - A pruned, sorted summary document (`TraceSummary`)
//! - Hot path analysis (most frequent call sites)

pub mod collector;
pub mod metrics;
pub mod subscription;
pub mod summary;
pub mod tree;

// Re-export main types and functions
pub use collector::TraceAggregator;
pub use metrics::{calculate_hot_paths, calculate_tree_stats, HotPath, TreeStats};
pub use subscription::AggregatorSubscription;
pub use summary::{SummaryMap, SummaryValue, TraceSummary};
pub use tree::TraceTreeNode;
