//! # Service declarations and the callback-facing surface.
//!
//! A [`Service`] is the user's declarative unit of work: an external shell
//! command or an in-process callback, with replication, tag, and optional
//! schedule. The engine turns each declaration into one worker per replica.
//!
//! ## Files & responsibilities
//! - **service.rs**: [`Service`] + [`ServiceAction`] (the exec/code sum type)
//!   and the registered form the engine stores after validation.
//! - **code.rs**: the [`Code`] trait (async, cancelable) and the
//!   closure-backed [`CodeFn`] adapter.
//! - **context.rs**: [`WorkerContext`], the handle a callback receives: port,
//!   log output, signal notifications, cancellation.
//! - **gate.rs**: edge-triggered signal notification shared between the hub
//!   and every context.
//!
//! ## Wiring
//! ```text
//! user code
//!   └─ Service::exec("cmd") / Service::code_fn(|ctx| async { .. })
//!        └─ Engine::add  → validated ServiceRecord (tag, ports, color)
//!             └─ Engine::run → WorkerActor per replica
//!                  └─ Code::call(WorkerContext)   (code services)
//! ```

mod code;
mod context;
mod gate;
mod service;

pub(crate) use gate::SignalGate;
pub(crate) use service::{clamp_workers, ServiceRecord};

pub use code::{Code, CodeFn, CodeRef};
pub use context::WorkerContext;
pub use service::{Service, ServiceAction};
