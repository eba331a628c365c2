//! Shared helpers for integration tests.

use std::io::Write;
use std::sync::{Arc, Mutex};

/// Cloneable in-memory sink handed to `Engine::set_logger`.
#[derive(Clone, Default)]
pub struct RecordSink(Arc<Mutex<Vec<u8>>>);

impl RecordSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All emitted records, one per line.
    pub fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Payloads of records carrying the given worker id, in emit order.
    pub fn payloads_for(&self, worker_id: &str) -> Vec<String> {
        let marker = format!(" {worker_id}");
        self.lines()
            .iter()
            .filter(|line| {
                line.split_once(" | ")
                    .map(|(prefix, _)| prefix.contains(&marker))
                    .unwrap_or(false)
            })
            .map(|line| line.split_once(" | ").expect("record separator").1.to_string())
            .collect()
    }
}

impl Write for RecordSink {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
