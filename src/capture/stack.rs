//! Live call-path capture.
//!
//! `BacktraceCapture` walks the current thread's stack with the `backtrace`
//! crate. Inlined frames are reported as separate logical frames, so the
//! number of frames the capture machinery itself contributes is not fixed.
//! Instead of skipping a constant count we drop the leading run of frames
//! that belong to the unwinder, this module or the sampling tracer; what is
//! left starts at the traced call site.

use super::frame::{Frame, Trace, UNRESOLVED_FUNCTION};
use crate::utils::config::MAX_CAPTURE_DEPTH;

/// Symbol fragments identifying capture/tracer bookkeeping frames
const BOOKKEEPING_MARKERS: &[&str] = &[
    "backtrace::",
    "callpath_trace::capture::stack::BacktraceCapture",
    "callpath_trace::tracer::sampling::SamplingTracer",
    "callpath_trace::tracer::ConfiguredTracer",
];

/// Bookkeeping frames only ever sit at the top of the stack
const BOOKKEEPING_WINDOW: usize = 32;

/// Source of call paths for a sampling tracer
pub trait StackCapture: Send + Sync {
    /// Capture the current call path, innermost first
    fn capture(&self) -> Trace;
}

impl<F> StackCapture for F
where
    F: Fn() -> Trace + Send + Sync,
{
    fn capture(&self) -> Trace {
        self()
    }
}

/// Captures the real stack of the calling thread
#[derive(Debug, Clone)]
pub struct BacktraceCapture {
    max_depth: usize,
}

impl Default for BacktraceCapture {
    fn default() -> Self {
        Self {
            max_depth: MAX_CAPTURE_DEPTH,
        }
    }
}

impl BacktraceCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit how many frames are kept per trace
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    #[inline(never)]
    fn walk(&self) -> Vec<Frame> {
        let limit = self.max_depth + BOOKKEEPING_WINDOW;
        let mut frames = Vec::with_capacity(32);

        backtrace::trace(|raw| {
            let before = frames.len();
            backtrace::resolve_frame(raw, |symbol| {
                let function = symbol
                    .name()
                    .map(|name| format!("{:#}", name))
                    .unwrap_or_else(|| UNRESOLVED_FUNCTION.to_string());
                frames.push(Frame {
                    function,
                    file: symbol.filename().map(|p| p.display().to_string()),
                    line: symbol.lineno(),
                });
            });
            if frames.len() == before {
                frames.push(Frame::named(UNRESOLVED_FUNCTION));
            }
            frames.len() < limit
        });

        frames
    }
}

impl StackCapture for BacktraceCapture {
    fn capture(&self) -> Trace {
        let mut frames = self.walk();
        let skip = bookkeeping_prefix_len(&frames);
        frames.drain(..skip);
        frames.truncate(self.max_depth);
        Trace::new(frames)
    }
}

/// Number of innermost frames that belong to capture bookkeeping
fn bookkeeping_prefix_len(frames: &[Frame]) -> usize {
    frames
        .iter()
        .take(BOOKKEEPING_WINDOW)
        .rposition(is_bookkeeping)
        .map_or(0, |last| last + 1)
}

fn is_bookkeeping(frame: &Frame) -> bool {
    BOOKKEEPING_MARKERS
        .iter()
        .any(|marker| frame.function.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[inline(never)]
    fn capture_from_here(capture: &BacktraceCapture) -> Trace {
        capture.capture()
    }

    #[test]
    fn test_bookkeeping_prefix_len() {
        let frames = vec![
            Frame::named("backtrace::backtrace::trace"),
            Frame::named("callpath_trace::capture::stack::BacktraceCapture::walk"),
            Frame::named(
                "<callpath_trace::capture::stack::BacktraceCapture as callpath_trace::capture::stack::StackCapture>::capture",
            ),
            Frame::named("callpath_trace::tracer::sampling::SamplingTracer::sample"),
            Frame::named("app::orders::load"),
            Frame::named("app::main"),
        ];
        assert_eq!(bookkeeping_prefix_len(&frames), 4);
    }

    #[test]
    fn test_bookkeeping_prefix_len_none() {
        let frames = vec![Frame::named("app::orders::load"), Frame::named("app::main")];
        assert_eq!(bookkeeping_prefix_len(&frames), 0);
        assert_eq!(bookkeeping_prefix_len(&[]), 0);
    }

    #[test]
    fn test_capture_skips_own_frames() {
        let trace = capture_from_here(&BacktraceCapture::new());

        assert!(!trace.is_empty());
        assert!(trace.frames().iter().take(BOOKKEEPING_WINDOW).all(|f| !is_bookkeeping(f)));
    }

    #[test]
    fn test_capture_respects_max_depth() {
        let trace = capture_from_here(&BacktraceCapture::with_max_depth(2));
        assert!(trace.len() <= 2);
    }

    #[test]
    fn test_closure_capture() {
        let capture = || Trace::from_call_chain(["a", "b"]);
        assert_eq!(capture.capture().len(), 2);
    }
}
