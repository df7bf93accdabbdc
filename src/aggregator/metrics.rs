//! Hot paths and distribution statistics over a call tree.
//!
//! Hot paths are the root-to-node paths where sampled calls ended, ranked by
//! how many samples ended there. These are the call sites that hit the
//! backend most often.

use super::tree::TraceTreeNode;
use log::debug;
use serde::{Deserialize, Serialize};

/// A call path and the samples that ended on it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotPath {
    /// Frame ids joined by `;`, outermost first
    pub stack: String,

    /// Samples whose path ended at the last frame
    pub samples: u64,

    /// Share of all samples folded into the tree
    pub percentage: f64,
}

/// Calculate hot paths from a call tree
///
/// **Public** - main entry point for metrics calculation
///
/// # Arguments
/// * `root` - Tree root; its counter is the total sample count
/// * `top_n` - Number of top paths to return
///
/// # Returns
/// Paths sorted by samples (descending). Ties keep tree order.
pub fn calculate_hot_paths(root: &TraceTreeNode, top_n: usize) -> Vec<HotPath> {
    let mut paths = Vec::new();
    let mut prefix = Vec::new();
    for child in root.children() {
        collect_paths(child, &mut prefix, root.counter(), &mut paths);
    }

    debug!(
        "Calculating top {} hot paths from {} distinct paths",
        top_n,
        paths.len()
    );

    paths.sort_by(|a, b| b.samples.cmp(&a.samples));
    paths.truncate(top_n);
    paths
}

/// Depth-first walk emitting one path per node with self samples
///
/// **Private** - recursive helper for calculate_hot_paths
fn collect_paths<'a>(
    node: &'a TraceTreeNode,
    prefix: &mut Vec<&'a str>,
    total: u64,
    out: &mut Vec<HotPath>,
) {
    prefix.push(node.id());

    let below: u64 = node.children().iter().map(TraceTreeNode::counter).sum();
    let own = node.counter().saturating_sub(below);
    if own > 0 {
        out.push(create_hot_path(prefix.join(";"), own, total));
    }

    for child in node.children() {
        collect_paths(child, prefix, total, out);
    }

    prefix.pop();
}

fn create_hot_path(stack: String, samples: u64, total: u64) -> HotPath {
    let percentage = if total > 0 {
        (samples as f64 / total as f64) * 100.0
    } else {
        0.0
    };

    HotPath {
        stack,
        samples,
        percentage,
    }
}

/// Shape statistics of a call tree
///
/// **Public** - returned from calculate_tree_stats
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeStats {
    /// Samples folded into the tree
    pub total_samples: u64,

    /// Nodes below the root
    pub node_count: usize,

    /// Longest root-to-leaf path, in frames
    pub max_depth: usize,

    /// Distinct paths where samples ended
    pub distinct_paths: usize,
}

/// Calculate shape statistics of a call tree
pub fn calculate_tree_stats(root: &TraceTreeNode) -> TreeStats {
    let mut prefix = Vec::new();
    let mut paths = Vec::new();
    for child in root.children() {
        collect_paths(child, &mut prefix, root.counter(), &mut paths);
    }

    TreeStats {
        total_samples: root.counter(),
        node_count: root.node_count() - 1,
        max_depth: root.depth(),
        distinct_paths: paths.len(),
    }
}

impl TreeStats {
    /// Get human-readable summary
    ///
    /// **Public** - for logging and reports
    pub fn summary(&self) -> String {
        format!(
            "Samples: {} | Nodes: {} | Max depth: {} | Distinct paths: {}",
            self.total_samples, self.node_count, self.max_depth, self.distinct_paths
        )
    }
}
