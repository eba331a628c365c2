use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Local;

use crate::logmux::palette::Color;

/// Shared sink handle. The mutex serializes whole records; workers contend
/// only for the duration of one formatted write.
type Sink = Arc<Mutex<Box<dyn Write + Send>>>;

/// Locks a mutex, recovering the guard if a writer panicked mid-record.
fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Factory for per-worker logger handles over one shared sink.
pub(crate) struct LogMux {
    out: Sink,
    color: bool,
    enabled: bool,
}

impl LogMux {
    /// Creates a multiplexer writing to `sink`.
    ///
    /// `color` wraps record prefixes in ANSI escapes; `enabled = false` turns
    /// every derived logger into a black hole (bytes accepted, nothing
    /// emitted).
    pub(crate) fn new(sink: Box<dyn Write + Send>, color: bool, enabled: bool) -> Self {
        Self {
            out: Arc::new(Mutex::new(sink)),
            color,
            enabled,
        }
    }

    /// Derives the logger handle for one worker.
    pub(crate) fn logger(&self, sid: &str, color: Color) -> Arc<WorkerLogger> {
        Arc::new(WorkerLogger {
            out: Arc::clone(&self.out),
            sid: sid.to_string(),
            color,
            color_on: self.color,
            enabled: self.enabled,
            buf: Mutex::new(Vec::new()),
        })
    }
}

/// # Per-worker write handle into the log multiplexer.
///
/// Owns the worker's line buffer: writes are framed on `\n`, each complete
/// line becomes one stamped record in the shared sink. The handle is the
/// worker's "pipe writer"; the supervisor closes it exactly once on exit,
/// flushing any trailing partial line.
pub struct WorkerLogger {
    out: Sink,
    sid: String,
    color: Color,
    color_on: bool,
    enabled: bool,
    buf: Mutex<Vec<u8>>,
}

impl WorkerLogger {
    /// Appends raw bytes, emitting one record per completed line.
    pub fn write(&self, data: &[u8]) {
        if !self.enabled {
            return;
        }
        let mut buf = lock(&self.buf);
        buf.extend_from_slice(data);
        while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = buf.drain(..=pos).collect();
            self.emit(&line[..line.len() - 1]);
        }
    }

    /// Writes one full line as a single record.
    pub fn write_line(&self, line: &str) {
        if !self.enabled {
            return;
        }
        // One write call so concurrent drains cannot interleave mid-line.
        let mut framed = Vec::with_capacity(line.len() + 1);
        framed.extend_from_slice(line.as_bytes());
        framed.push(b'\n');
        self.write(&framed);
    }

    /// Flushes a trailing partial line, appending a synthetic newline.
    ///
    /// Called once by the owning worker supervisor when it returns.
    pub(crate) fn close(&self) {
        if !self.enabled {
            return;
        }
        let mut buf = lock(&self.buf);
        if !buf.is_empty() {
            let rest: Vec<u8> = buf.drain(..).collect();
            self.emit(&rest);
        }
    }

    /// Formats and writes one record. Caller holds the line buffer lock, so
    /// records from this worker keep their write order.
    fn emit(&self, line: &[u8]) {
        let text = String::from_utf8_lossy(line);
        let ts = Local::now().format("%H:%M:%S");
        let mut out = lock(&self.out);
        let _ = if self.color_on {
            writeln!(
                out,
                "\x1b[{}m{} {:<10} |\x1b[0m {}",
                self.color.code(),
                ts,
                self.sid,
                text
            )
        } else {
            writeln!(out, "{} {:<10} | {}", ts, self.sid, text)
        };
        let _ = out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logmux::palette::pick;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Buffer {
        fn lines(&self) -> Vec<String> {
            let bytes = self.0.lock().unwrap().clone();
            String::from_utf8_lossy(&bytes)
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    impl Write for Buffer {
        fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(data);
            Ok(data.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn record_payload(record: &str) -> &str {
        record.split_once(" | ").expect("record separator").1
    }

    fn record_prefix(record: &str) -> &str {
        record.split_once(" | ").expect("record separator").0
    }

    #[test]
    fn frames_lines_into_tagged_records() {
        let sink = Buffer::default();
        let mux = LogMux::new(Box::new(sink.clone()), false, true);
        let logger = mux.logger("web.1", pick(1));

        logger.write(b"hello\nworld\n");

        let lines = sink.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(record_payload(&lines[0]), "hello");
        assert_eq!(record_payload(&lines[1]), "world");
        for line in &lines {
            let prefix = record_prefix(line);
            // "HH:MM:SS " + tag padded to 10 columns.
            assert_eq!(prefix.len(), 8 + 1 + 10);
            assert_eq!(&prefix[2..3], ":");
            assert_eq!(&prefix[5..6], ":");
            assert!(prefix[9..].starts_with("web.1"));
        }
    }

    #[test]
    fn buffers_partial_lines_until_newline() {
        let sink = Buffer::default();
        let mux = LogMux::new(Box::new(sink.clone()), false, true);
        let logger = mux.logger("a.1", pick(1));

        logger.write(b"hel");
        assert!(sink.lines().is_empty());
        logger.write(b"lo\n");
        assert_eq!(record_payload(&sink.lines()[0]), "hello");
    }

    #[test]
    fn close_flushes_partial_with_synthetic_newline() {
        let sink = Buffer::default();
        let mux = LogMux::new(Box::new(sink.clone()), false, true);
        let logger = mux.logger("a.1", pick(1));

        logger.write(b"tail without newline");
        logger.close();

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(record_payload(&lines[0]), "tail without newline");
    }

    #[test]
    fn color_wraps_prefix_only() {
        let sink = Buffer::default();
        let mux = LogMux::new(Box::new(sink.clone()), true, true);
        let logger = mux.logger("c.1", pick(2));

        logger.write_line("payload");

        let line = sink.lines().remove(0);
        assert!(line.starts_with("\x1b[34m"));
        assert!(line.contains("|\x1b[0m payload"));
        assert!(!line.ends_with("\x1b[0m"));
    }

    #[test]
    fn disabled_logger_drops_everything() {
        let sink = Buffer::default();
        let mux = LogMux::new(Box::new(sink.clone()), false, false);
        let logger = mux.logger("a.1", pick(1));

        logger.write(b"gone\n");
        logger.close();
        assert!(sink.lines().is_empty());
    }
}
