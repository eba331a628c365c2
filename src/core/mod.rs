//! # Engine core: orchestration and lifecycle.
//!
//! The only public API re-exported from here is [`Engine`] (and the
//! [`Signal`] value type). Everything else is an internal building block the
//! engine wires together.
//!
//! ## Files & responsibilities
//! - **engine.rs**: public facade; validates and registers services, explodes
//!   them into workers, spawns actors in registration order, starts the cron
//!   dispatcher and the signal hub, drives the final join.
//! - **actor.rs**: per-worker supervision loop: exec-notice banner, one run
//!   of the command or callback, restart decision (signal/zero exit and
//!   callback `Ok` are terminal, everything else restarts).
//! - **command.rs**: shell resolution (`bash -c` / `cmd /c`), `$PORT`
//!   expansion and child-process wiring.
//! - **cron.rs**: timer loops for scheduled services; one-shot fires, missed
//!   ticks skipped, concurrent fires allowed.
//! - **hub.rs**: the single task that owns live child pids and translates OS
//!   signals / scope cancellation into broadcasts.
//! - **signals.rs**: the [`Signal`] value type and the OS signal streams.
//!
//! ## Data-plane
//! ```text
//! Engine::run()
//!   ├─ spawn SignalHub ◄───────── Register/Retire pids ── WorkerActor
//!   │        │  ▲                                            │
//!   │        │  └── {HUP, TERM, INT} from the OS             │ stdout/stderr
//!   │        └────► kill(pid, sig) / SignalGate.notify       ▼
//!   ├─ spawn WorkerActor per replica ──────────────► LogMux records
//!   ├─ CronDispatcher ── fires ─► one-shot WorkerActor runs
//!   └─ join actors → stop cron → stop hub → return
//! ```
//!
//! ## Shutdown timeline
//! ```text
//! TERM/HUP → gate.notify → scope.cancel (once) → TERM to live pids
//! → actors see signal exits / cancellation and return, closing their loggers
//! → engine joins, stops cron ticks, stops the hub (signal streams dropped)
//! ```

mod actor;
mod command;
mod cron;
mod engine;
mod hub;
mod signals;

pub use engine::Engine;
pub use signals::Signal;
