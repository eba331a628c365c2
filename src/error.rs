//! # Error types used by the procvisor engine and service callbacks.
//!
//! Two enums cover the two failure domains:
//!
//! - [`EngineError`] configuration and startup errors raised by the engine itself.
//! - [`CodeError`] errors returned by in-process service callbacks.
//!
//! Both types provide an `as_label` helper producing short stable strings for
//! logs and metrics.
//!
//! Per-worker runtime failures (a child that exits non-zero, a spawn that
//! fails) are never surfaced through these types: they are written to the log
//! multiplexer and handled by the worker's restart policy.

use thiserror::Error;

/// # Errors produced by engine configuration and startup.
///
/// All variants are returned synchronously from [`Engine::add`](crate::Engine::add),
/// [`Engine::env`](crate::Engine::env) or [`Engine::run`](crate::Engine::run);
/// a failing call leaves no partial effect behind.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EngineError {
    /// Attempted to register a service under a tag that is already taken.
    #[error("tag '{tag}' already exists")]
    TagExists {
        /// The duplicate tag.
        tag: String,
    },

    /// The port allocator ran off the end of the probe range.
    #[error("no free tcp port between {min} and {max}")]
    PortExhausted {
        /// Bottom of the probed range.
        min: u16,
        /// Top of the probed range.
        max: u16,
    },

    /// A service carried a schedule string the cron parser rejected.
    #[error("invalid schedule '{spec}' for tag '{tag}': {reason}")]
    Schedule {
        /// Tag of the offending service.
        tag: String,
        /// The schedule string as given.
        spec: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// An environment entry the OS layer would reject (empty key, `=` or NUL).
    #[error("cannot set environment variable {name:?}: {reason}")]
    Env {
        /// The offending key.
        name: String,
        /// Why it was refused.
        reason: String,
    },

    /// No usable shell for exec services, and none was configured.
    #[error("could not find a usable shell (looked for '{tried}' on PATH)")]
    ShellNotFound {
        /// The shell binary that was looked up.
        tried: String,
    },
}

impl EngineError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EngineError::TagExists { .. } => "engine_tag_exists",
            EngineError::PortExhausted { .. } => "engine_port_exhausted",
            EngineError::Schedule { .. } => "engine_bad_schedule",
            EngineError::Env { .. } => "engine_bad_env",
            EngineError::ShellNotFound { .. } => "engine_shell_not_found",
        }
    }
}

/// # Errors returned by service callbacks.
///
/// A callback returning `Err` is restarted by its worker supervisor for as
/// long as the engine scope is live; returning `Ok` ends the worker.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CodeError {
    /// The callback failed; the supervisor will run it again.
    #[error("execution failed: {reason}")]
    Fail {
        /// Human-readable cause.
        reason: String,
    },

    /// The callback observed cancellation and unwound.
    ///
    /// Not an error in the traditional sense; the supervisor treats it the
    /// same as any other `Err`, but the scope is gone, so no restart follows.
    #[error("context canceled")]
    Canceled,
}

impl CodeError {
    /// Shorthand for [`CodeError::Fail`].
    pub fn fail(reason: impl Into<String>) -> Self {
        CodeError::Fail {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            CodeError::Fail { .. } => "code_failed",
            CodeError::Canceled => "code_canceled",
        }
    }
}

impl From<std::io::Error> for CodeError {
    fn from(e: std::io::Error) -> Self {
        CodeError::Fail {
            reason: e.to_string(),
        }
    }
}
