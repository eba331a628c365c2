//! # WorkerActor: single-worker supervisor.
//!
//! One actor per replica of a long-running service (and one shared actor per
//! replica of a scheduled service, driven by the cron dispatcher instead of
//! the supervision loop).
//!
//! ## Supervision loop
//! ```text
//! loop {
//!   scope cancelled?            → exit
//!   exec-notice banner          → worker's log
//!   run once (command/callback)
//!   ├─ spawn failed             → log, short pause, retry
//!   ├─ killed by a signal       → exit            (command)
//!   ├─ exit status 0 / Ok(())   → exit
//!   └─ non-zero exit / Err      → restart immediately
//! }
//! close logger (flush trailing partial line)
//! ```
//!
//! ## Rules
//! - The child's pid is published to the hub before the actor waits on it
//!   and retired right after the wait returns.
//! - Stdout and stderr are drained into the worker's logger by two side
//!   tasks; the actor joins them after the wait so records are not lost.
//! - The logger is closed exactly once, when the actor returns.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::command::Shell;
use crate::core::hub::HubMsg;
use crate::error::CodeError;
use crate::logmux::WorkerLogger;
use crate::services::{CodeRef, SignalGate, WorkerContext};

/// Pause before retrying a spawn that failed outright, so a missing binary
/// does not turn the loop into a busy spin.
const SPAWN_RETRY_PAUSE: Duration = Duration::from_millis(100);

/// What one worker runs.
pub(crate) enum ActorAction {
    Exec { cmd: String, shell: Shell },
    Code { code: CodeRef },
}

/// Outcome of one command run.
enum ExitOutcome {
    SpawnFailed,
    Clean,
    Failed(i32),
    Signaled,
}

/// Supervisor for one worker replica.
pub(crate) struct WorkerActor {
    pub(crate) sid: String,
    pub(crate) tag: String,
    pub(crate) port: u16,
    pub(crate) action: ActorAction,
    pub(crate) logger: Arc<WorkerLogger>,
    pub(crate) scope: CancellationToken,
    pub(crate) gate: Arc<SignalGate>,
    pub(crate) hub: mpsc::UnboundedSender<HubMsg>,
    pub(crate) exec_notice: bool,
}

impl WorkerActor {
    /// Runs the long-running supervision loop until a terminal exit.
    pub(crate) async fn run(self) {
        match &self.action {
            ActorAction::Exec { cmd, shell } => self.supervise_exec(cmd, shell).await,
            ActorAction::Code { code } => self.supervise_code(code).await,
        }
        self.logger.close();
    }

    /// Runs the action once, for a cron fire. No restart, no banner, and the
    /// logger stays open for the next fire.
    pub(crate) async fn fire(&self) {
        match &self.action {
            ActorAction::Exec { cmd, shell } => {
                let _ = self.run_command_once(cmd, shell).await;
            }
            ActorAction::Code { code } => {
                if let Err(e) = self.run_code_once(code).await {
                    self.logger.write_line(&format!("callback error: {e}"));
                    tracing::warn!(worker = %self.sid, error = %e, "scheduled callback failed");
                }
            }
        }
    }

    /// Writes the exec-notice banner for this worker.
    pub(crate) fn announce(&self) {
        match &self.action {
            ActorAction::Exec { cmd, .. } => {
                self.logger.write_line(&format!("Exec command: {cmd}"));
            }
            ActorAction::Code { .. } => {
                self.logger.write_line(&format!("Callback: {}", self.tag));
            }
        }
    }

    async fn supervise_exec(&self, cmd: &str, shell: &Shell) {
        loop {
            if self.scope.is_cancelled() {
                break;
            }
            if self.exec_notice {
                self.announce();
            }
            match self.run_command_once(cmd, shell).await {
                ExitOutcome::SpawnFailed => {
                    if self.scope.is_cancelled() {
                        break;
                    }
                    tokio::time::sleep(SPAWN_RETRY_PAUSE).await;
                }
                ExitOutcome::Signaled => break,
                ExitOutcome::Clean => break,
                ExitOutcome::Failed(code) => {
                    tracing::debug!(worker = %self.sid, code, "command failed; restarting");
                    if self.scope.is_cancelled() {
                        break;
                    }
                }
            }
        }
    }

    async fn supervise_code(&self, code: &CodeRef) {
        loop {
            if self.scope.is_cancelled() {
                break;
            }
            if self.exec_notice {
                self.announce();
            }
            match self.run_code_once(code).await {
                Ok(()) => break,
                Err(e) => {
                    self.logger.write_line(&format!("callback error: {e}"));
                    tracing::warn!(worker = %self.sid, error = %e, "callback failed; restarting");
                }
            }
        }
    }

    async fn run_command_once(&self, cmd: &str, shell: &Shell) -> ExitOutcome {
        let mut child = match shell.command(cmd, self.port).spawn() {
            Ok(c) => c,
            Err(e) => {
                self.logger.write_line(&format!("spawn failed: {e}"));
                tracing::warn!(worker = %self.sid, error = %e, "spawn failed");
                return ExitOutcome::SpawnFailed;
            }
        };

        // Publish before waiting so the hub can reach the child.
        let pid = child.id();
        if let Some(pid) = pid {
            let _ = self.hub.send(HubMsg::Register(pid));
        }

        let out = child.stdout.take().map(|s| drain(s, self.logger.clone()));
        let err = child.stderr.take().map(|s| drain(s, self.logger.clone()));

        let status = child.wait().await;

        if let Some(pid) = pid {
            let _ = self.hub.send(HubMsg::Retire(pid));
        }
        if let Some(h) = out {
            let _ = h.await;
        }
        if let Some(h) = err {
            let _ = h.await;
        }

        match status {
            Err(e) => {
                self.logger.write_line(&format!("wait failed: {e}"));
                ExitOutcome::Failed(-1)
            }
            Ok(st) => {
                #[cfg(unix)]
                {
                    use std::os::unix::process::ExitStatusExt;
                    if st.signal().is_some() {
                        return ExitOutcome::Signaled;
                    }
                }
                if st.success() {
                    ExitOutcome::Clean
                } else {
                    ExitOutcome::Failed(st.code().unwrap_or(-1))
                }
            }
        }
    }

    async fn run_code_once(&self, code: &CodeRef) -> Result<(), CodeError> {
        code.call(self.context()).await
    }

    /// The context handed to callbacks; persistent across restarts and cron
    /// fires of this worker.
    fn context(&self) -> WorkerContext {
        WorkerContext {
            scope: self.scope.clone(),
            gate: self.gate.clone(),
            logger: self.logger.clone(),
            port: self.port,
        }
    }
}

/// Drains one child stream into the worker's logger, line by line.
fn drain<R>(stream: R, logger: Arc<WorkerLogger>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            logger.write_line(&line);
        }
    })
}
