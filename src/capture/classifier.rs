//! Frame classification: deciding which frames are runtime plumbing.
//!
//! The rule is host-specific, so the aggregator takes it as an injected
//! capability. `RuntimeFrameClassifier` is a symbol-prefix rule that suits
//! binaries built on the standard library and tokio.

use super::frame::{Frame, UNRESOLVED_FUNCTION};

/// Decides whether a frame belongs to runtime-internal code
pub trait FrameClassifier: Send + Sync {
    /// True if the frame should be left out of call trees
    fn is_internal(&self, frame: &Frame) -> bool;
}

impl<F> FrameClassifier for F
where
    F: Fn(&Frame) -> bool + Send + Sync,
{
    fn is_internal(&self, frame: &Frame) -> bool {
        self(frame)
    }
}

/// Classifier that keeps every frame
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepAllFrames;

impl FrameClassifier for KeepAllFrames {
    fn is_internal(&self, _frame: &Frame) -> bool {
        false
    }
}

/// Symbol prefixes treated as runtime-internal by default
pub const DEFAULT_INTERNAL_PREFIXES: &[&str] = &[
    "std::",
    "core::",
    "alloc::",
    "tokio::",
    "futures::",
    "futures_util::",
    "futures_core::",
    "futures_executor::",
    "async_trait::",
    "backtrace::",
    "test::",
    "callpath_trace::proxy::",
    "__rust",
    "__libc_start",
    "_start",
    "start_thread",
    "clone3",
    UNRESOLVED_FUNCTION,
];

/// Prefix-based classifier
#[derive(Debug, Clone)]
pub struct RuntimeFrameClassifier {
    prefixes: Vec<String>,
}

impl Default for RuntimeFrameClassifier {
    fn default() -> Self {
        Self {
            prefixes: DEFAULT_INTERNAL_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

impl RuntimeFrameClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifier with no prefixes at all
    pub fn empty() -> Self {
        Self {
            prefixes: Vec::new(),
        }
    }

    /// Also treat frames starting with `prefix` as internal
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}

impl FrameClassifier for RuntimeFrameClassifier {
    fn is_internal(&self, frame: &Frame) -> bool {
        // Trait impls demangle as "<path::Type as path::Trait>::method"
        let name = frame.function.trim_start_matches('<');
        self.prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }
}
