//! Console output sink.
//!
//! The harness has an explicit output contract (progress banners, skip
//! notices, warnings, total time). Everything on that contract flows through
//! an [`OutputSink`] handle rather than bare `println!`, so tests can capture
//! and assert on it. Ambient diagnostics go through `tracing` instead.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

enum SinkTarget {
    Stdout,
    Buffer(Vec<u8>),
}

/// Cloneable handle to the run's console output
///
/// All clones write to the same target. The engine session and the
/// orchestrator share one sink, matching the single console of a run.
#[derive(Clone)]
pub struct OutputSink {
    target: Arc<Mutex<SinkTarget>>,
}

impl OutputSink {
    /// Sink that writes to process stdout, flushing per line
    #[must_use]
    pub fn stdout() -> Self {
        Self {
            target: Arc::new(Mutex::new(SinkTarget::Stdout)),
        }
    }

    /// Sink that captures output in memory, for tests
    #[must_use]
    pub fn capture() -> Self {
        Self {
            target: Arc::new(Mutex::new(SinkTarget::Buffer(Vec::new()))),
        }
    }

    /// Write one line followed by a newline
    pub fn line(&self, text: &str) {
        self.write_all(text.as_bytes());
        self.write_all(b"\n");
    }

    /// Write an empty line
    pub fn blank(&self) {
        self.write_all(b"\n");
    }

    /// Everything written so far, if this is a capturing sink
    #[must_use]
    pub fn captured(&self) -> Option<String> {
        let guard = self.target.lock().ok()?;
        match &*guard {
            SinkTarget::Stdout => None,
            SinkTarget::Buffer(buf) => Some(String::from_utf8_lossy(buf).into_owned()),
        }
    }

    fn write_all(&self, bytes: &[u8]) {
        // A poisoned lock or a broken stdout pipe is not worth failing a run
        // over; output is best-effort.
        if let Ok(mut guard) = self.target.lock() {
            match &mut *guard {
                SinkTarget::Stdout => {
                    let mut out = io::stdout();
                    let _ = out.write_all(bytes);
                    let _ = out.flush();
                }
                SinkTarget::Buffer(buf) => buf.extend_from_slice(bytes),
            }
        }
    }
}

impl std::fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OutputSink")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_collects_lines() {
        let sink = OutputSink::capture();
        sink.line("first");
        sink.blank();
        sink.line("second");
        assert_eq!(sink.captured().unwrap(), "first\n\nsecond\n");
    }

    #[test]
    fn test_clones_share_target() {
        let sink = OutputSink::capture();
        let other = sink.clone();
        other.line("via clone");
        assert!(sink.captured().unwrap().contains("via clone"));
    }

    #[test]
    fn test_stdout_sink_has_no_capture() {
        let sink = OutputSink::stdout();
        assert!(sink.captured().is_none());
    }
}
