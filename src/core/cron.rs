//! # Cron dispatcher for scheduled services.
//!
//! Each scheduled worker replica registers one `(schedule, job)` entry. When
//! the dispatcher starts, every entry gets its own tick loop: sleep until the
//! schedule's next matching instant, then detach a one-shot run of the job.
//!
//! ## Rules
//! - Fires are detached: concurrent fires of the same entry are allowed, and
//!   in-flight fires are not joined at shutdown.
//! - A tick that was missed under load is skipped, never queued; the loop
//!   always sleeps toward the *next* upcoming instant.
//! - Tick loops end when the stop token fires or the schedule has no further
//!   instants.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::Local;
use cron::Schedule;
use tokio_util::sync::CancellationToken;

pub(crate) type JobFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type Job = Arc<dyn Fn() -> JobFuture + Send + Sync>;

struct CronEntry {
    schedule: Schedule,
    job: Job,
}

/// Holds scheduled entries until the engine starts them.
pub(crate) struct CronDispatcher {
    entries: Vec<CronEntry>,
}

impl CronDispatcher {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registers one scheduled job.
    pub(crate) fn register<F>(&mut self, schedule: Schedule, job: F)
    where
        F: Fn() -> JobFuture + Send + Sync + 'static,
    {
        self.entries.push(CronEntry {
            schedule,
            job: Arc::new(job),
        });
    }

    /// Spawns one tick loop per entry. Loops stop when `stop` fires.
    pub(crate) fn start(self, stop: CancellationToken) {
        for entry in self.entries {
            tokio::spawn(tick_loop(entry, stop.clone()));
        }
    }
}

async fn tick_loop(entry: CronEntry, stop: CancellationToken) {
    loop {
        let Some(next) = entry.schedule.upcoming(Local).next() else {
            break;
        };
        let wait = (next - Local::now())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);

        tokio::select! {
            _ = stop.cancelled() => break,
            _ = tokio::time::sleep(wait) => {
                tracing::debug!("cron fire");
                tokio::spawn((entry.job)());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn fires_roughly_once_per_second_and_stops() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut cron = CronDispatcher::new();
        let schedule = Schedule::from_str("* * * * * *").unwrap();
        {
            let fired = Arc::clone(&fired);
            cron.register(schedule, move || {
                let fired = Arc::clone(&fired);
                Box::pin(async move {
                    fired.fetch_add(1, Ordering::SeqCst);
                })
            });
        }

        let stop = CancellationToken::new();
        cron.start(stop.clone());

        tokio::time::sleep(Duration::from_millis(2500)).await;
        stop.cancel();
        let after_stop = fired.load(Ordering::SeqCst);
        assert!((1..=4).contains(&after_stop), "got {after_stop} fires");

        // No further fires once stopped.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), after_stop);
    }
}
