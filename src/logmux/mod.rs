//! # Log multiplexer: one sink, many workers.
//!
//! Every worker owns a [`WorkerLogger`] handle. Bytes written through the
//! handle are framed into lines, stamped and tagged, and serialized into the
//! engine's single sink.
//!
//! ## Architecture
//! ```text
//! child stdout ──┐
//! child stderr ──┼─► WorkerLogger (per worker)
//! ctx.println ───┘        │ frame lines, stamp, pad tag
//!                         ▼
//!                  sink mutex ──► one Write sink (stderr by default)
//! ```
//!
//! ## Rules
//! - Record shape: `HH:MM:SS tag.N       | <line>\n`, tag field left-justified
//!   to 10 columns.
//! - With color on, the `HH:MM:SS tag.N | ` prefix is wrapped in
//!   `ESC[<c>m … ESC[0m`; the payload stays uncolored.
//! - A trailing partial line is flushed with a synthetic newline when the
//!   logger is closed.
//! - Records from one worker appear in write order; nothing is promised
//!   across workers.
//! - Sink write errors are swallowed: the sink is observability, not control
//!   flow.

mod mux;
mod palette;

pub(crate) use mux::LogMux;
pub(crate) use palette::{pick, Color};

pub use mux::WorkerLogger;
