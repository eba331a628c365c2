//! # procvisor
//!
//! **Procvisor** is a foreman-style process supervisor library.
//!
//! An application declares a set of named services — external shell commands
//! or in-process async callbacks — and runs them concurrently with one entry
//! point: per-service worker replication, a line-oriented log multiplexer,
//! cron-style scheduling, and coordinated signal propagation. It is designed
//! to be embedded: one-binary dev servers, integration-test harnesses, small
//! clusters of sidecars.
//!
//! ## Features
//!
//! | Area            | Description                                                          | Key types                       |
//! |-----------------|----------------------------------------------------------------------|---------------------------------|
//! | **Services**    | Declare commands or callbacks with replication, tags, schedules.     | [`Service`], [`ServiceAction`]  |
//! | **Callbacks**   | In-process service bodies with a rich per-worker handle.             | [`Code`], [`CodeFn`], [`WorkerContext`] |
//! | **Supervision** | Restart on failure, terminal on clean or signalled exits.            | [`Engine`]                      |
//! | **Logging**     | Timestamped, tagged, optionally colored records into one sink.       | [`Engine::set_logger`]          |
//! | **Scheduling**  | Cron-fired one-shot runs of any service.                             | [`Service::with_every`]         |
//! | **Signals**     | HUP/TERM/INT relayed to children and surfaced to callbacks.          | [`Signal`], [`WorkerContext::recv`] |
//! | **Errors**      | Typed configuration and callback errors.                             | [`EngineError`], [`CodeError`]  |
//!
//! ```no_run
//! use tokio_util::sync::CancellationToken;
//! use procvisor::{Engine, Service};
//!
//! #[tokio::main(flavor = "multi_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let root = CancellationToken::new();
//!     let mut engine = Engine::new(root.clone());
//!     engine.enable_color();
//!
//!     engine.add(vec![
//!         Service::exec("plackup --port $PORT").with_tag("plack"),
//!         Service::exec("echo 'This is cron!!'")
//!             .with_tag("cron")
//!             .with_every("*/30 * * * * *")
//!             .with_workers(2),
//!         Service::code_fn(|ctx| async move {
//!             ctx.println(format!("Hello procvisor!! Port: {}", ctx.port()));
//!             ctx.cancelled().await;
//!             Ok::<_, procvisor::CodeError>(())
//!         })
//!         .with_tag("hello")
//!         .with_workers(3),
//!     ])?;
//!
//!     engine.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Shutdown semantics
//!
//! - **SIGTERM / SIGHUP**: the engine scope is cancelled, TERM is forwarded
//!   to every live child, and [`Engine::run`] returns once the workers have
//!   drained.
//! - **SIGINT**: forwarded to children; the engine keeps running.
//! - **Parent scope cancelled**: silent by default — children are left
//!   running; opt into prompt termination with
//!   [`Engine::set_cancel_signal`].
//!
//! ---

mod config;
mod core;
mod error;
mod logmux;
mod ports;
mod services;

// ---- Public re-exports ----

pub use crate::config::Config;
pub use crate::core::{Engine, Signal};
pub use crate::error::{CodeError, EngineError};
pub use crate::services::{Code, CodeFn, CodeRef, Service, ServiceAction, WorkerContext};
