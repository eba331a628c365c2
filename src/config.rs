//! # Global engine configuration.
//!
//! [`Config`] defines the engine's behavior: startup pacing between workers,
//! colored log records, whether the log multiplexer and the exec-notice
//! banners are active, the signal delivered to children on scope
//! cancellation, and an optional per-engine shell override.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use procvisor::{Config, Signal};
//!
//! let mut cfg = Config::default();
//! cfg.interval = Duration::from_secs(1);
//! cfg.color = true;
//! cfg.cancel_signal = Some(Signal::Terminate);
//!
//! assert!(cfg.log_worker);
//! ```

use std::path::PathBuf;
use std::time::Duration;

use crate::core::Signal;

/// Global configuration for an [`Engine`](crate::Engine).
///
/// Every field has a matching setter on the engine; construct the engine with
/// [`Engine::with_config`](crate::Engine::with_config) to set everything at once.
#[derive(Clone, Debug)]
pub struct Config {
    /// Sleep between spawning successive long-running workers.
    /// Scheduled services are registered without consuming the interval.
    pub interval: Duration,
    /// Wrap the timestamp+tag prefix of each log record in an ANSI color.
    pub color: bool,
    /// Run the log multiplexer. When disabled, worker output is drained and
    /// discarded.
    pub log_worker: bool,
    /// Write a one-line `Exec command:` / `Callback:` banner before each
    /// worker (re)start.
    pub exec_notice: bool,
    /// Signal delivered to live children when the parent scope is cancelled.
    /// `None` means silent cancellation: children are left running.
    pub cancel_signal: Option<Signal>,
    /// Shell used to run exec services. `None` picks the platform default
    /// (`bash` on unix, `cmd` on windows) from `PATH`.
    pub shell: Option<PathBuf>,
}

impl Default for Config {
    /// Provides a default configuration:
    /// - `interval = 0` (no pacing)
    /// - `color = false`
    /// - `log_worker = true`
    /// - `exec_notice = true`
    /// - `cancel_signal = None` (silent cancellation)
    /// - `shell = None` (platform default)
    fn default() -> Self {
        Self {
            interval: Duration::ZERO,
            color: false,
            log_worker: true,
            exec_notice: true,
            cancel_signal: None,
            shell: None,
        }
    }
}
