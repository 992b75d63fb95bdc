//! # Output Sinks
//!
//! A [`Sink`] receives fully formatted lines. The printer never inspects what
//! happens to them; a sink that cannot write drops the line.
//!
//! ```text
//!     Printer ──► "file.rs(12): msg\n" ──► Sink
//!                                           ├── StderrSink   (default)
//!                                           ├── StdoutSink
//!                                           ├── BufferSink   (captured for tests)
//!                                           ├── TracingSink  (tracing INFO event)
//!                                           └── NullSink
//! ```

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

/// Destination of formatted lines.
pub trait Sink: Send + Sync {
    /// Writes one formatted line. Failures are absorbed by the sink.
    fn write(&self, text: &str);
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn write(&self, text: &str) {
        (**self).write(text)
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn write(&self, text: &str) {
        (**self).write(text)
    }
}

/// Writes to standard error.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrSink;

impl Sink for StderrSink {
    fn write(&self, text: &str) {
        let _ = io::stderr().lock().write_all(text.as_bytes());
    }
}

/// Writes to standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl Sink for StdoutSink {
    fn write(&self, text: &str) {
        let mut out = io::stdout().lock();
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl Sink for NullSink {
    fn write(&self, _text: &str) {}
}

/// Collects output in memory. Clones share the same buffer.
///
/// ```rust
/// use qprint::{BufferSink, Sink};
///
/// let sink = BufferSink::new();
/// let handle = sink.clone();
/// sink.write("one\n");
/// sink.write("two\n");
/// assert_eq!(handle.lines(), vec!["one", "two"]);
/// ```
#[derive(Clone, Default)]
pub struct BufferSink {
    buf: Arc<Mutex<String>>,
}

impl BufferSink {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn contents(&self) -> String {
        self.buf
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Written output split into lines, without line terminators.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Discards the captured output.
    pub fn clear(&self) {
        self.buf
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Sink for BufferSink {
    fn write(&self, text: &str) {
        self.buf
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_str(text);
    }
}

impl fmt::Debug for BufferSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferSink")
            .field("len", &self.buf.lock().unwrap_or_else(PoisonError::into_inner).len())
            .finish()
    }
}

/// Emits each line as a `tracing` event at INFO level under target `qprint`.
///
/// The trailing newline is stripped; subscribers add their own.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl Sink for TracingSink {
    fn write(&self, text: &str) {
        info!(target: "qprint", "{}", text.trim_end_matches('\n'));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_buffer_sink_shared_between_clones() {
        let sink = BufferSink::new();
        assert!(sink.is_empty());

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let sink = sink.clone();
                thread::spawn(move || sink.write(&format!("line {}\n", i)))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut lines = sink.lines();
        lines.sort();
        assert_eq!(lines, vec!["line 0", "line 1", "line 2", "line 3"]);

        sink.clear();
        assert!(sink.is_empty());
        assert_eq!(sink.contents(), "");
    }

    #[test]
    fn test_dyn_sinks() {
        let buffer = BufferSink::new();
        let boxed: Box<dyn Sink> = Box::new(buffer.clone());
        let sinks: Vec<Arc<dyn Sink>> = vec![
            Arc::new(NullSink) as Arc<dyn Sink>,
            Arc::new(buffer.clone()),
            Arc::new(boxed),
        ];
        for sink in &sinks {
            sink.write("x");
        }
        assert_eq!(buffer.contents(), "xx");
    }

    #[test]
    fn test_std_sinks_do_not_panic() {
        StderrSink.write("");
        StdoutSink.write("");
    }

    #[test]
    fn test_tracing_sink_emits_event() {
        let events = BufferSink::new();
        let writer = events.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || SinkWriter(writer.clone()))
            .with_ansi(false)
            .without_time()
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            TracingSink.write("main.rs(3): hello\n");
        });

        let output = events.contents();
        assert!(output.contains("INFO"));
        assert!(output.contains("qprint"));
        assert!(output.contains("main.rs(3): hello"));
    }

    struct SinkWriter(BufferSink);

    impl io::Write for SinkWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Sink::write(&self.0, &String::from_utf8_lossy(buf));
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
