//! Edge-triggered signal notification for callbacks.
//!
//! The hub calls [`SignalGate::notify`] once per delivered OS signal; every
//! context currently awaiting [`SignalGate::wait`] wakes exactly once. The
//! wake token is swapped under the mutex on each notify, so a waiter that
//! arrives after a delivery observes the *next* signal, never the previous
//! one.

use std::sync::{Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;

use crate::core::Signal;

struct Inner {
    last: Option<Signal>,
    epoch: CancellationToken,
}

/// Shared edge-triggered signal latch.
pub(crate) struct SignalGate {
    inner: Mutex<Inner>,
}

impl SignalGate {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                last: None,
                epoch: CancellationToken::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Records `sig` and wakes the current epoch's waiters.
    ///
    /// A fresh epoch is installed before the old one fires, so late waiters
    /// park on the new one.
    pub(crate) fn notify(&self, sig: Signal) {
        let fired = {
            let mut g = self.lock();
            g.last = Some(sig);
            std::mem::replace(&mut g.epoch, CancellationToken::new())
        };
        fired.cancel();
    }

    /// Completes when the next signal after this call is delivered.
    pub(crate) async fn wait(&self) {
        let epoch = self.lock().epoch.clone();
        epoch.cancelled().await;
    }

    /// The most recently delivered signal, if any.
    pub(crate) fn last(&self) -> Option<Signal> {
        self.lock().last
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    #[tokio::test]
    async fn waiters_wake_once_per_notify() {
        let gate = Arc::new(SignalGate::new());

        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.wait().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        gate.notify(Signal::Terminate);
        timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
        assert_eq!(gate.last(), Some(Signal::Terminate));

        // A wait entered after the delivery parks on the next epoch.
        let pending = timeout(Duration::from_millis(50), gate.wait()).await;
        assert!(pending.is_err(), "must not observe the previous signal");

        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.wait().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        gate.notify(Signal::Interrupt);
        timeout(Duration::from_secs(1), waiter)
            .await
            .expect("second delivery should wake")
            .unwrap();
        assert_eq!(gate.last(), Some(Signal::Interrupt));
    }
}
