//! # Worker context handed to service callbacks.
//!
//! [`WorkerContext`] is the callback's window into the engine: the worker's
//! assigned port, output routed through the log multiplexer under the
//! worker's tag and color, edge-triggered signal notifications, and the
//! engine's cancellation scope.
//!
//! It is passed as a distinguished parameter to [`Code::call`](crate::Code::call);
//! there is no downcasting from a generic scope.
//!
//! ## Rules
//! - Output methods never block the worker beyond the sink mutex.
//! - [`recv`](WorkerContext::recv) is edge-triggered: it completes on the
//!   next delivery after the call, never on a signal that already happened.
//! - Cancellation is advisory: the engine never aborts a callback, it only
//!   cancels the scope and (optionally) signals external children.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

use crate::core::Signal;
use crate::logmux::WorkerLogger;
use crate::services::gate::SignalGate;

/// # Per-worker handle passed to callbacks.
///
/// Cheap to clone; all clones refer to the same worker.
#[derive(Clone)]
pub struct WorkerContext {
    pub(crate) scope: CancellationToken,
    pub(crate) gate: Arc<SignalGate>,
    pub(crate) logger: Arc<WorkerLogger>,
    pub(crate) port: u16,
}

impl WorkerContext {
    /// The worker's assigned TCP port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The assigned port in `":<port>"` listen-address form.
    pub fn serve_addr(&self) -> String {
        format!(":{}", self.port)
    }

    /// Writes raw bytes through the log multiplexer.
    ///
    /// Bytes are framed on newlines; a partial line is buffered until the
    /// next newline or worker exit.
    pub fn write(&self, data: &[u8]) {
        self.logger.write(data);
    }

    /// Writes text through the log multiplexer without a trailing newline.
    pub fn print(&self, text: impl AsRef<str>) {
        self.logger.write(text.as_ref().as_bytes());
    }

    /// Writes one line through the log multiplexer.
    pub fn println(&self, line: impl AsRef<str>) {
        self.logger.write_line(line.as_ref());
    }

    /// Streams a reader into the log multiplexer until EOF.
    ///
    /// Returns the number of bytes copied.
    pub async fn copy<R>(&self, mut src: R) -> std::io::Result<u64>
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = [0u8; 8192];
        let mut total = 0u64;
        loop {
            let n = src.read(&mut buf).await?;
            if n == 0 {
                return Ok(total);
            }
            self.logger.write(&buf[..n]);
            total += n as u64;
        }
    }

    /// Completes when the engine next observes a hang-up, terminate or
    /// interrupt signal.
    ///
    /// Edge-triggered: a delivery that happened before this call is not
    /// replayed. Poll in a loop to react to every signal.
    pub async fn recv(&self) {
        self.gate.wait().await;
    }

    /// The signal most recently delivered to the engine, if any.
    pub fn last_signal(&self) -> Option<Signal> {
        self.gate.last()
    }

    /// The engine cancellation scope this worker runs under.
    pub fn token(&self) -> &CancellationToken {
        &self.scope
    }

    /// Whether the engine scope has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.scope.is_cancelled()
    }

    /// Completes when the engine scope is cancelled.
    pub async fn cancelled(&self) {
        self.scope.cancelled().await;
    }
}
