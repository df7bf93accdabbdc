//! Frame and Trace value types.
//!
//! A Trace is ordered innermost (the capture point) to outermost (the root
//! caller). Traces are immutable and cheap to clone, so the same capture can
//! be fanned out to any number of subscribers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Function name used for frames whose symbol could not be resolved
pub const UNRESOLVED_FUNCTION: &str = "??";

/// One entry of a captured call path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Frame {
    /// Demangled function name (without hash suffix)
    pub function: String,

    /// Source file, if debug info is available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Source line, if debug info is available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl Frame {
    /// Create a frame with a known source location
    pub fn new(function: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            function: function.into(),
            file: Some(file.into()),
            line: Some(line),
        }
    }

    /// Create a frame that only carries a function name
    pub fn named(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            file: None,
            line: None,
        }
    }

    /// Stable key identifying this frame in a call tree
    ///
    /// Equal frames from different traces always produce the same id,
    /// which is what lets repeated paths share tree nodes.
    pub fn id(&self) -> String {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => format!("{} ({}:{})", self.function, file, line),
            (Some(file), None) => format!("{} ({})", self.function, file),
            _ => self.function.clone(),
        }
    }

    /// True when the symbol could not be resolved
    pub fn is_unresolved(&self) -> bool {
        self.function == UNRESOLVED_FUNCTION
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

/// One immutable captured call path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    frames: Arc<[Frame]>,
}

impl Trace {
    /// Wrap frames already ordered innermost first
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    /// Build a trace from function names listed outermost caller first
    ///
    /// `["main", "handle", "load"]` describes `main` calling `handle` calling
    /// `load`, where `load` is the capture point.
    pub fn from_call_chain<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut frames: Vec<Frame> = names.into_iter().map(Frame::named).collect();
        frames.reverse();
        Self::new(frames)
    }

    /// Frames, innermost first
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Callee-to-caller order (feeds the bottom-up tree)
    pub fn innermost_first(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    /// Caller-to-callee order (feeds the top-down tree)
    pub fn outermost_first(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter().rev()
    }
}

impl Default for Trace {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl From<Vec<Frame>> for Trace {
    fn from(frames: Vec<Frame>) -> Self {
        Self::new(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_id_with_location() {
        let frame = Frame::new("app::load_user", "src/users.rs", 42);
        assert_eq!(frame.id(), "app::load_user (src/users.rs:42)");
    }

    #[test]
    fn test_frame_id_without_location() {
        assert_eq!(Frame::named("app::main").id(), "app::main");

        let frame = Frame {
            function: "app::main".to_string(),
            file: Some("src/main.rs".to_string()),
            line: None,
        };
        assert_eq!(frame.id(), "app::main (src/main.rs)");
    }

    #[test]
    fn test_from_call_chain_orders_innermost_first() {
        let trace = Trace::from_call_chain(["a", "b", "c"]);
        let inner: Vec<_> = trace.innermost_first().map(|f| f.function.as_str()).collect();
        let outer: Vec<_> = trace.outermost_first().map(|f| f.function.as_str()).collect();

        assert_eq!(inner, vec!["c", "b", "a"]);
        assert_eq!(outer, vec!["a", "b", "c"]);
        assert_eq!(trace.len(), 3);
    }

    #[test]
    fn test_trace_clone_shares_frames() {
        let trace = Trace::from_call_chain(["a", "b"]);
        let copy = trace.clone();
        assert!(std::ptr::eq(trace.frames().as_ptr(), copy.frames().as_ptr()));
    }
}
