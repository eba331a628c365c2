//! # OS signal plumbing.
//!
//! [`Signal`] is the engine's platform-neutral signal value; the listener
//! half wraps the tokio signal streams for the three signals the engine
//! reacts to.
//!
//! ## Unix
//! - **SIGHUP** and **SIGTERM** shut the engine down (scope cancelled, TERM
//!   forwarded to children).
//! - **SIGINT** is forwarded to children without cancelling the scope.
//!
//! ## Windows / other
//! Only ctrl-c is available; it is surfaced as [`Signal::Interrupt`].

use std::fmt;

/// Signal value delivered to the engine or forwarded to children.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    /// Hang-up (SIGHUP). Treated as a shutdown request.
    Hangup,
    /// Terminate (SIGTERM). Treated as a shutdown request.
    Terminate,
    /// Interrupt (SIGINT / ctrl-c). Forwarded to children only.
    Interrupt,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Signal::Hangup => "hangup",
            Signal::Terminate => "terminate",
            Signal::Interrupt => "interrupt",
        };
        f.write_str(name)
    }
}

#[cfg(unix)]
impl Signal {
    pub(crate) fn as_nix(self) -> nix::sys::signal::Signal {
        match self {
            Signal::Hangup => nix::sys::signal::Signal::SIGHUP,
            Signal::Terminate => nix::sys::signal::Signal::SIGTERM,
            Signal::Interrupt => nix::sys::signal::Signal::SIGINT,
        }
    }
}

/// Listener over the OS signals the engine handles.
#[cfg(unix)]
pub(crate) struct SignalListener {
    hup: tokio::signal::unix::Signal,
    term: tokio::signal::unix::Signal,
    int: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl SignalListener {
    /// Registers the three signal streams. Dropping the listener
    /// unregisters them.
    pub(crate) fn new() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            hup: signal(SignalKind::hangup())?,
            term: signal(SignalKind::terminate())?,
            int: signal(SignalKind::interrupt())?,
        })
    }

    /// Completes on the next delivery of any handled signal.
    pub(crate) async fn recv(&mut self) -> Signal {
        tokio::select! {
            _ = self.hup.recv() => Signal::Hangup,
            _ = self.term.recv() => Signal::Terminate,
            _ = self.int.recv() => Signal::Interrupt,
        }
    }
}

#[cfg(not(unix))]
pub(crate) struct SignalListener;

#[cfg(not(unix))]
impl SignalListener {
    pub(crate) fn new() -> std::io::Result<Self> {
        Ok(Self)
    }

    pub(crate) async fn recv(&mut self) -> Signal {
        // ctrl-c is the only portable delivery; treat it as interrupt.
        match tokio::signal::ctrl_c().await {
            Ok(()) => Signal::Interrupt,
            Err(_) => std::future::pending().await,
        }
    }
}
