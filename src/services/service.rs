//! # Service declaration and its registered form.
//!
//! [`Service`] is what users hand to [`Engine::add`](crate::Engine::add):
//! an action (external command or in-process callback), a replication count,
//! an optional tag and an optional cron schedule. Validation happens at
//! `add` time and produces a [`ServiceRecord`], the engine-internal form with
//! the clamped worker count, the resolved tag, the parsed schedule, the
//! allocated base port and the assigned color.

use std::fmt;

use cron::Schedule;

use crate::error::CodeError;
use crate::logmux::Color;
use crate::services::code::{CodeFn, CodeRef};
use crate::services::context::WorkerContext;

/// Replication ceiling; requests above it are clamped.
pub(crate) const MAX_WORKERS: i32 = 100;

/// What a service runs: an external command through the shell, or an
/// in-process callback.
///
/// The two are mutually exclusive by construction; there is no precedence
/// rule to remember.
#[derive(Clone)]
pub enum ServiceAction {
    /// Shell command line. The literal token `$PORT` is replaced with the
    /// worker's assigned port, and `PORT` is set in the child environment.
    Exec(String),
    /// In-process callback invoked with the worker's context.
    Code(CodeRef),
}

impl fmt::Debug for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceAction::Exec(cmd) => f.debug_tuple("Exec").field(cmd).finish(),
            ServiceAction::Code(_) => f.debug_tuple("Code").field(&"..").finish(),
        }
    }
}

/// # Declarative description of one logical service.
///
/// Build with [`Service::exec`], [`Service::code`] or [`Service::code_fn`],
/// then refine with the `with_*` methods.
///
/// # Example
/// ```
/// use procvisor::Service;
///
/// let web = Service::exec("my-server --listen :$PORT")
///     .with_tag("web")
///     .with_workers(3);
///
/// let tick = Service::exec("echo tick")
///     .with_tag("tick")
///     .with_every("*/30 * * * * *");
/// # let _ = (web, tick);
/// ```
#[derive(Clone, Debug)]
pub struct Service {
    pub(crate) action: ServiceAction,
    pub(crate) workers: i32,
    pub(crate) tag: Option<String>,
    pub(crate) every: Option<String>,
}

impl Service {
    /// Declares a service that runs a shell command.
    pub fn exec(cmd: impl Into<String>) -> Self {
        Self {
            action: ServiceAction::Exec(cmd.into()),
            workers: 1,
            tag: None,
            every: None,
        }
    }

    /// Declares a service that runs an in-process callback.
    pub fn code(code: CodeRef) -> Self {
        Self {
            action: ServiceAction::Code(code),
            workers: 1,
            tag: None,
            every: None,
        }
    }

    /// Declares a callback service from a closure.
    ///
    /// Sugar over [`Service::code`] + [`CodeFn::arc`].
    pub fn code_fn<F, Fut>(func: F) -> Self
    where
        F: FnMut(WorkerContext) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<(), CodeError>> + Send + 'static,
    {
        Self::code(CodeFn::arc(func))
    }

    /// Sets the replication count.
    ///
    /// Clamped to `[1, 100]` at registration; zero and negative values
    /// become one worker.
    pub fn with_workers(mut self, workers: i32) -> Self {
        self.workers = workers;
        self
    }

    /// Sets the service tag (log prefix and worker-id stem).
    ///
    /// Tags are unique per engine; an empty declaration is auto-tagged with
    /// the service ordinal.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Sets a cron schedule, turning the service into a scheduled one-shot.
    ///
    /// The syntax is whatever the cron parser accepts: second-resolution
    /// expressions like `*/5 * * * * *` and shorthands like `@hourly`.
    pub fn with_every(mut self, spec: impl Into<String>) -> Self {
        self.every = Some(spec.into());
        self
    }
}

/// Clamps a raw replication request into `[1, MAX_WORKERS]`.
pub(crate) fn clamp_workers(workers: i32) -> usize {
    workers.clamp(1, MAX_WORKERS) as usize
}

/// Registered form of a service after `add`-time validation.
pub(crate) struct ServiceRecord {
    pub(crate) action: ServiceAction,
    pub(crate) tag: String,
    pub(crate) workers: usize,
    pub(crate) schedule: Option<Schedule>,
    pub(crate) base_port: u16,
    pub(crate) color: Color,
}

impl ServiceRecord {
    pub(crate) fn is_exec(&self) -> bool {
        matches!(self.action, ServiceAction::Exec(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_count_is_clamped() {
        assert_eq!(clamp_workers(0), 1);
        assert_eq!(clamp_workers(-100), 1);
        assert_eq!(clamp_workers(1), 1);
        assert_eq!(clamp_workers(42), 42);
        assert_eq!(clamp_workers(100), 100);
        assert_eq!(clamp_workers(40_000), 100);
    }
}
