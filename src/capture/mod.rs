//! Call-path capture and frame classification.
//!
//! This module provides:
//! - `Frame` / `Trace` value types
//! - Live stack capture (`BacktraceCapture`)
//! - Frame classification (which frames are runtime plumbing)

pub mod classifier;
pub mod frame;
pub mod stack;

// Re-export main types
pub use classifier::{FrameClassifier, KeepAllFrames, RuntimeFrameClassifier};
pub use frame::{Frame, Trace};
pub use stack::{BacktraceCapture, StackCapture};
