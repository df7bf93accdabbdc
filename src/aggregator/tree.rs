//! Call tree built by folding traces.
//!
//! Each node counts the traces whose (filtered) path passes through it; the
//! root counts every trace folded into the tree. Equal frames collapse onto
//! the same child because children are keyed by `Frame::id`.
//!
//! Example: folding `main;load;query` twice and `main;load;cache` once gives
//!
//! ```text
//! root 3
//! └─ main 3
//!    └─ load 3
//!       ├─ query 2
//!       └─ cache 1
//! ```

use super::summary::{count_key, SummaryMap, SummaryValue};
use crate::capture::{Frame, FrameClassifier};
use crate::utils::config::{PRUNE_DIVISOR, SKIPPED_KEY};
use std::collections::HashMap;

/// A node of a call tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceTreeNode {
    id: String,
    counter: u64,
    /// Allocated on first child
    children: Option<Children>,
}

/// Children in insertion order plus a key index
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Children {
    nodes: Vec<TraceTreeNode>,
    index: HashMap<String, usize>,
}

impl TraceTreeNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            counter: 0,
            children: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Children in the order they were first seen
    pub fn children(&self) -> &[TraceTreeNode] {
        match &self.children {
            Some(children) => &children.nodes,
            None => &[],
        }
    }

    pub fn child(&self, id: &str) -> Option<&TraceTreeNode> {
        let children = self.children.as_ref()?;
        children.index.get(id).map(|&i| &children.nodes[i])
    }

    pub fn is_leaf(&self) -> bool {
        self.children().is_empty()
    }

    /// Longest path below this node, in edges
    pub fn depth(&self) -> usize {
        self.children()
            .iter()
            .map(|child| child.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Total number of nodes in this subtree, including this one
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(TraceTreeNode::node_count).sum::<usize>()
    }

    /// Fold one trace into the tree
    ///
    /// Frames are walked in the given order; frames the classifier marks as
    /// internal are skipped without breaking the chain.
    pub fn add_trace<'a, I>(&mut self, frames: I, classifier: &dyn FrameClassifier)
    where
        I: IntoIterator<Item = &'a Frame>,
    {
        self.counter += 1;

        let mut node = self;
        for frame in frames {
            if classifier.is_internal(frame) {
                continue;
            }
            node = node.child_entry(frame.id());
            node.counter += 1;
        }
    }

    /// Look up or create the child for `key`
    fn child_entry(&mut self, key: String) -> &mut TraceTreeNode {
        let children = self.children.get_or_insert_with(Children::default);
        let slot = match children.index.get(&key) {
            Some(&slot) => slot,
            None => {
                let slot = children.nodes.len();
                children.nodes.push(TraceTreeNode::new(key.clone()));
                children.index.insert(key, slot);
                slot
            }
        };
        &mut children.nodes[slot]
    }

    /// Summarize this subtree
    ///
    /// Leaves emit `{ id: counter }`. Internal nodes emit
    /// `{ "[counter] id": { ...children... } }` with children sorted by
    /// descending counter (ties keep insertion order). Unless `complete` is
    /// set, children below `counter / 100` are folded into a trailing
    /// `"skipped"` total.
    pub fn as_sorted_map(&self, complete: bool) -> SummaryMap {
        let mut result = SummaryMap::new();

        if self.is_leaf() {
            result.insert(self.id.clone(), SummaryValue::Count(self.counter));
            return result;
        }

        let mut sorted: Vec<&TraceTreeNode> = self.children().iter().collect();
        // Stable sort: equal counters stay in insertion order
        sorted.sort_by(|a, b| b.counter.cmp(&a.counter));

        let threshold = if complete {
            0
        } else {
            self.counter / PRUNE_DIVISOR
        };

        let mut body = SummaryMap::new();
        let mut skipped = None;
        for child in sorted {
            if child.counter < threshold {
                *skipped.get_or_insert(0) += child.counter;
            } else {
                body.extend(child.as_sorted_map(complete));
            }
        }
        if let Some(total) = skipped {
            body.insert(SKIPPED_KEY, SummaryValue::Count(total));
        }

        result.insert(count_key(self.counter, &self.id), SummaryValue::Node(body));
        result
    }
}
