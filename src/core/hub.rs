//! # Signal & cancellation hub.
//!
//! A single task owns the set of live child pids and translates three event
//! sources into broadcasts:
//!
//! - **Register/Retire** messages from worker actors (a pid right after
//!   spawn, and again right after the actor reaped the child).
//! - **OS signals** {HUP, TERM, INT} from [`SignalListener`].
//! - **Scope cancellation** from the engine's parent scope.
//!
//! ## Rules
//! - The pid slots are owned exclusively by the hub task; nobody else reads
//!   or mutates them.
//! - Retired entries become `None`; registration reuses the first free slot
//!   before appending (a compaction-free free list).
//! - HUP/TERM cancel the engine scope once, then forward TERM to every live
//!   pid. INT forwards INT without cancelling.
//! - Scope cancellation stops the cron dispatcher, delivers the configured
//!   `cancel_signal` (if any), and ends the hub. The default is silent:
//!   children are left running.
//! - A pid that cannot be signalled is treated as already gone and retired.
//! - A signal racing a registration simply misses that child; delivery is
//!   best-effort, not transactional.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::signals::{Signal, SignalListener};
use crate::services::SignalGate;

/// Pid traffic from worker actors to the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HubMsg {
    /// A child was just spawned.
    Register(u32),
    /// The owning actor reaped the child.
    Retire(u32),
}

/// The single task that owns live child pids.
pub(crate) struct SignalHub {
    rx: mpsc::UnboundedReceiver<HubMsg>,
    gate: Arc<SignalGate>,
    scope: CancellationToken,
    cron_stop: CancellationToken,
    stop: CancellationToken,
    cancel_signal: Option<Signal>,
}

impl SignalHub {
    pub(crate) fn new(
        rx: mpsc::UnboundedReceiver<HubMsg>,
        gate: Arc<SignalGate>,
        scope: CancellationToken,
        cron_stop: CancellationToken,
        stop: CancellationToken,
        cancel_signal: Option<Signal>,
    ) -> Self {
        Self {
            rx,
            gate,
            scope,
            cron_stop,
            stop,
            cancel_signal,
        }
    }

    pub(crate) async fn run(mut self) {
        let mut listener = match SignalListener::new() {
            Ok(l) => Some(l),
            Err(e) => {
                tracing::warn!(error = %e, "signal listener unavailable; OS signals will not be handled");
                None
            }
        };

        let mut procs: Vec<Option<u32>> = Vec::new();
        let mut cancelled_once = false;

        loop {
            tokio::select! {
                _ = self.stop.cancelled() => break,
                _ = self.scope.cancelled() => {
                    self.cron_stop.cancel();
                    if let Some(sig) = self.cancel_signal {
                        tracing::debug!(signal = %sig, "scope cancelled; signalling children");
                        self.gate.notify(sig);
                        deliver(sig, &mut procs);
                    }
                    break;
                }
                sig = recv_signal(&mut listener) => {
                    tracing::debug!(signal = %sig, "os signal received");
                    match sig {
                        Signal::Hangup | Signal::Terminate => {
                            self.gate.notify(Signal::Terminate);
                            if !cancelled_once {
                                cancelled_once = true;
                                self.scope.cancel();
                            }
                            deliver(Signal::Terminate, &mut procs);
                        }
                        Signal::Interrupt => {
                            self.gate.notify(Signal::Interrupt);
                            deliver(Signal::Interrupt, &mut procs);
                        }
                    }
                }
                msg = self.rx.recv() => match msg {
                    Some(HubMsg::Register(pid)) => place(&mut procs, pid),
                    Some(HubMsg::Retire(pid)) => retire(&mut procs, pid),
                    None => break,
                },
            }
        }
        // Dropping the listener here unregisters the OS signal streams.
    }
}

async fn recv_signal(listener: &mut Option<SignalListener>) -> Signal {
    match listener {
        Some(l) => l.recv().await,
        None => std::future::pending().await,
    }
}

/// Places a pid in the first free slot, appending only when none is free.
fn place(procs: &mut Vec<Option<u32>>, pid: u32) {
    for slot in procs.iter_mut() {
        if slot.is_none() {
            *slot = Some(pid);
            return;
        }
    }
    procs.push(Some(pid));
}

/// Frees every slot holding `pid`.
fn retire(procs: &mut [Option<u32>], pid: u32) {
    for slot in procs.iter_mut() {
        if *slot == Some(pid) {
            *slot = None;
        }
    }
}

#[cfg(unix)]
fn deliver(sig: Signal, procs: &mut [Option<u32>]) {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    for slot in procs.iter_mut() {
        if let Some(pid) = *slot {
            // A delivery error means the process is already gone.
            if kill(Pid::from_raw(pid as i32), sig.as_nix()).is_err() {
                *slot = None;
            }
        }
    }
}

#[cfg(not(unix))]
fn deliver(_sig: Signal, _procs: &mut [Option<u32>]) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn place_reuses_free_slots_before_appending() {
        let mut procs = Vec::new();
        place(&mut procs, 10);
        place(&mut procs, 11);
        place(&mut procs, 12);
        assert_eq!(procs, vec![Some(10), Some(11), Some(12)]);

        retire(&mut procs, 11);
        assert_eq!(procs, vec![Some(10), None, Some(12)]);

        place(&mut procs, 13);
        assert_eq!(procs, vec![Some(10), Some(13), Some(12)]);

        place(&mut procs, 14);
        assert_eq!(procs.len(), 4);
        assert_eq!(procs[3], Some(14));
    }

    #[test]
    fn retire_of_unknown_pid_is_a_noop() {
        let mut procs = vec![Some(1), None];
        retire(&mut procs, 99);
        assert_eq!(procs, vec![Some(1), None]);
    }
}
