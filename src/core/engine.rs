//! # Engine: public facade and run loop.
//!
//! The [`Engine`] owns the declarative service list and, on
//! [`run`](Engine::run), turns it into running workers:
//!
//! - Explodes each service into one worker per replica, in registration
//!   order, replicas ascending.
//! - Spawns a [`WorkerActor`] per long-running worker, sleeping the
//!   configured interval between spawns; scheduled workers are registered
//!   with the cron dispatcher without consuming the interval.
//! - Starts the signal hub, which owns live child pids for the whole run.
//! - Joins every long-running actor, then stops the cron ticks and the hub.
//!
//! ## Rules
//! - `add` validates a whole batch before committing any of it: a duplicate
//!   tag, a bad schedule or an exhausted port allocator leaves the engine
//!   exactly as it was.
//! - `add` takes `&mut self`; concurrent registration needs external
//!   serialization by construction.
//! - `run` consumes the engine and returns only after every long-running
//!   worker has exited and the dispatcher has stopped. In-flight cron fires
//!   are not joined.
//!
//! ```no_run
//! use tokio_util::sync::CancellationToken;
//! use procvisor::{Engine, Service, Signal};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let root = CancellationToken::new();
//!     let mut engine = Engine::new(root.clone());
//!     engine.enable_color();
//!     engine.set_cancel_signal(Signal::Terminate);
//!
//!     engine.add(vec![
//!         Service::exec("my-server --listen :$PORT").with_tag("web").with_workers(2),
//!         Service::code_fn(|ctx| async move {
//!             ctx.println(format!("sidecar on {}", ctx.serve_addr()));
//!             ctx.cancelled().await;
//!             Ok::<_, procvisor::CodeError>(())
//!         })
//!         .with_tag("sidecar"),
//!     ])?;
//!
//!     engine.run().await?;
//!     Ok(())
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use cron::Schedule;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::core::actor::{ActorAction, WorkerActor};
use crate::core::command::Shell;
use crate::core::cron::CronDispatcher;
use crate::core::hub::{HubMsg, SignalHub};
use crate::core::signals::Signal;
use crate::error::EngineError;
use crate::logmux::{pick, LogMux};
use crate::ports::PortAllocator;
use crate::services::{clamp_workers, Service, ServiceAction, ServiceRecord, SignalGate};

/// One exploded worker, ready to spawn or to hand to the cron dispatcher.
struct PlannedWorker {
    schedule: Option<Schedule>,
    actor: WorkerActor,
}

/// # Foreman-style supervisor engine.
///
/// Declare services with [`add`](Engine::add), then [`run`](Engine::run)
/// them until the parent scope is cancelled or a terminating signal arrives.
pub struct Engine {
    cfg: Config,
    sink: Option<Box<dyn Write + Send>>,
    services: Vec<ServiceRecord>,
    tags: HashSet<String>,
    ordinal: usize,
    ports: PortAllocator,
    scope: CancellationToken,
    gate: Arc<SignalGate>,
}

impl Engine {
    /// Creates an engine bound to an external cancellation scope.
    ///
    /// The engine runs under a child of `parent`: cancelling the parent
    /// shuts the engine down, while signal-driven shutdown stays local to
    /// this engine.
    pub fn new(parent: CancellationToken) -> Self {
        Self::with_config(parent, Config::default())
    }

    /// Creates an engine with explicit configuration.
    pub fn with_config(parent: CancellationToken, cfg: Config) -> Self {
        Self {
            cfg,
            sink: None,
            services: Vec::new(),
            tags: HashSet::new(),
            ordinal: 0,
            ports: PortAllocator::new(),
            scope: parent.child_token(),
            gate: Arc::new(SignalGate::new()),
        }
    }

    /// Sets the sleep between spawning successive long-running workers.
    pub fn set_interval(&mut self, interval: Duration) {
        self.cfg.interval = interval;
    }

    /// Colors the prefix of each log record by service.
    pub fn enable_color(&mut self) {
        self.cfg.color = true;
    }

    /// Replaces the default stderr sink.
    pub fn set_logger(&mut self, sink: impl Write + Send + 'static) {
        self.sink = Some(Box::new(sink));
    }

    /// Suppresses log multiplexing entirely.
    pub fn disable_logger(&mut self) {
        self.cfg.log_worker = false;
    }

    /// Omits the `Exec command:` / `Callback:` banners.
    pub fn disable_exec_notice(&mut self) {
        self.cfg.exec_notice = false;
    }

    /// Delivers `sig` to live children when the parent scope is cancelled.
    ///
    /// Without this, cancellation is silent: children are left running and
    /// only callbacks observe the scope.
    pub fn set_cancel_signal(&mut self, sig: Signal) {
        self.cfg.cancel_signal = Some(sig);
    }

    /// Overrides the shell used for exec services.
    pub fn set_shell(&mut self, path: impl Into<PathBuf>) {
        self.cfg.shell = Some(path.into());
    }

    /// Sets process-wide environment variables.
    ///
    /// The whole map is validated before anything is set; entries the OS
    /// layer would reject (empty keys, `=` or NUL bytes) fail the call with
    /// no partial effect.
    pub fn env(&mut self, envs: &HashMap<String, String>) -> Result<(), EngineError> {
        for (key, value) in envs {
            if key.is_empty() {
                return Err(EngineError::Env {
                    name: key.clone(),
                    reason: "empty name".into(),
                });
            }
            if key.contains('=') || key.contains('\0') {
                return Err(EngineError::Env {
                    name: key.clone(),
                    reason: "name contains '=' or NUL".into(),
                });
            }
            if value.contains('\0') {
                return Err(EngineError::Env {
                    name: key.clone(),
                    reason: "value contains NUL".into(),
                });
            }
        }
        for (key, value) in envs {
            std::env::set_var(key, value);
        }
        Ok(())
    }

    /// Validates and registers a batch of services.
    ///
    /// Per service: the ordinal advances, an empty tag becomes the ordinal,
    /// the worker count is clamped to `[1, 100]`, a schedule string is
    /// parsed, a base port is allocated and a color assigned. Any failure
    /// rolls the whole batch back.
    pub fn add(&mut self, services: Vec<Service>) -> Result<(), EngineError> {
        let mut staged: Vec<ServiceRecord> = Vec::with_capacity(services.len());
        let mut ordinal = self.ordinal;
        let mut ports = self.ports.clone();

        for service in services {
            ordinal += 1;

            let tag = match service.tag {
                Some(tag) => tag,
                None => ordinal.to_string(),
            };
            if self.tags.contains(&tag) || staged.iter().any(|r| r.tag == tag) {
                return Err(EngineError::TagExists { tag });
            }

            let schedule = match &service.every {
                Some(spec) => {
                    let parsed =
                        Schedule::from_str(spec).map_err(|e| EngineError::Schedule {
                            tag: tag.clone(),
                            spec: spec.clone(),
                            reason: e.to_string(),
                        })?;
                    Some(parsed)
                }
                None => None,
            };

            staged.push(ServiceRecord {
                action: service.action,
                tag,
                workers: clamp_workers(service.workers),
                schedule,
                base_port: ports.next()?,
                color: pick(ordinal),
            });
        }

        self.ordinal = ordinal;
        self.ports = ports;
        for record in &staged {
            self.tags.insert(record.tag.clone());
        }
        self.services.extend(staged);
        Ok(())
    }

    /// Runs every registered service until shutdown.
    ///
    /// Returns after the scope is cancelled or a terminating signal has been
    /// observed, every long-running worker has exited, the cron dispatcher
    /// has stopped and the signal listeners are gone.
    pub async fn run(mut self) -> Result<(), EngineError> {
        let shell = match self.services.iter().any(ServiceRecord::is_exec) {
            true => Some(Shell::resolve(self.cfg.shell.as_deref())?),
            false => None,
        };

        let sink = self
            .sink
            .take()
            .unwrap_or_else(|| Box::new(std::io::stderr()));
        let mux = LogMux::new(sink, self.cfg.color, self.cfg.log_worker);

        let (hub_tx, hub_rx) = mpsc::unbounded_channel();
        let cron_stop = CancellationToken::new();
        let hub_stop = CancellationToken::new();
        let hub = SignalHub::new(
            hub_rx,
            Arc::clone(&self.gate),
            self.scope.clone(),
            cron_stop.clone(),
            hub_stop.clone(),
            self.cfg.cancel_signal,
        );
        let hub_handle = tokio::spawn(hub.run());

        let planned = self.assemble(&mux, &shell, &hub_tx)?;
        drop(hub_tx);

        let mut cron = CronDispatcher::new();
        let mut actors: JoinSet<()> = JoinSet::new();

        for worker in planned {
            match worker.schedule {
                Some(schedule) => {
                    // Scheduled entries announce once, at registration.
                    if self.cfg.exec_notice {
                        worker.actor.announce();
                    }
                    let actor = Arc::new(worker.actor);
                    cron.register(schedule, move || {
                        let actor = Arc::clone(&actor);
                        Box::pin(async move { actor.fire().await })
                    });
                }
                None => {
                    actors.spawn(worker.actor.run());
                    if !self.cfg.interval.is_zero() {
                        tokio::time::sleep(self.cfg.interval).await;
                    }
                }
            }
        }

        cron.start(cron_stop.clone());
        tracing::debug!(services = self.services.len(), "engine running");

        while actors.join_next().await.is_some() {}

        cron_stop.cancel();
        hub_stop.cancel();
        let _ = hub_handle.await;
        tracing::debug!("engine stopped");
        Ok(())
    }

    /// Explodes services into workers: `tag.i` ids, `base_port + i` ports,
    /// registration order preserved, replicas ascending.
    fn assemble(
        &self,
        mux: &LogMux,
        shell: &Option<Shell>,
        hub_tx: &mpsc::UnboundedSender<HubMsg>,
    ) -> Result<Vec<PlannedWorker>, EngineError> {
        let mut planned = Vec::new();
        for record in &self.services {
            for i in 1..=record.workers {
                let sid = format!("{}.{}", record.tag, i);
                let port = record.base_port + i as u16;
                let action = match &record.action {
                    ServiceAction::Exec(cmd) => {
                        let shell =
                            shell
                                .clone()
                                .ok_or_else(|| EngineError::ShellNotFound {
                                    tried: Shell::default_name().to_string(),
                                })?;
                        ActorAction::Exec {
                            cmd: cmd.clone(),
                            shell,
                        }
                    }
                    ServiceAction::Code(code) => ActorAction::Code { code: code.clone() },
                };
                planned.push(PlannedWorker {
                    schedule: record.schedule.clone(),
                    actor: WorkerActor {
                        logger: mux.logger(&sid, record.color),
                        sid,
                        tag: record.tag.clone(),
                        port,
                        action,
                        scope: self.scope.clone(),
                        gate: Arc::clone(&self.gate),
                        hub: hub_tx.clone(),
                        exec_notice: self.cfg.exec_notice,
                    },
                });
            }
        }
        Ok(planned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        Engine::new(CancellationToken::new())
    }

    fn noop() -> Service {
        Service::code_fn(|_ctx| async { Ok::<_, crate::error::CodeError>(()) })
    }

    #[test]
    fn defaults_match_contract() {
        let e = engine();
        assert_eq!(e.cfg.interval, Duration::ZERO);
        assert!(!e.cfg.color);
        assert!(e.cfg.log_worker);
        assert!(e.cfg.exec_notice);
        assert!(e.cfg.cancel_signal.is_none());
    }

    #[test]
    fn duplicate_tag_is_rejected_without_partial_effect() {
        let mut e = engine();
        e.add(vec![noop().with_tag("x")]).unwrap();

        let err = e.add(vec![noop().with_tag("x")]).unwrap_err();
        assert!(matches!(err, EngineError::TagExists { ref tag } if tag == "x"));
        assert_eq!(e.services.len(), 1);

        // Duplicates inside one batch are caught too, and the valid head of
        // the batch is rolled back.
        let err = e
            .add(vec![noop().with_tag("y"), noop().with_tag("y")])
            .unwrap_err();
        assert!(matches!(err, EngineError::TagExists { ref tag } if tag == "y"));
        assert_eq!(e.services.len(), 1);
        assert!(!e.tags.contains("y"));
    }

    #[test]
    fn empty_tags_become_ordinals_across_calls() {
        let mut e = engine();
        e.add(vec![noop(), noop()]).unwrap();
        e.add(vec![noop().with_tag("named"), noop()]).unwrap();

        let tags: Vec<&str> = e.services.iter().map(|r| r.tag.as_str()).collect();
        assert_eq!(tags, vec!["1", "2", "named", "4"]);
    }

    #[test]
    fn worker_counts_are_clamped_at_registration() {
        let mut e = engine();
        e.add(vec![
            noop().with_tag("none").with_workers(0),
            noop().with_tag("neg").with_workers(-7),
            noop().with_tag("big").with_workers(40_000),
        ])
        .unwrap();

        let counts: Vec<usize> = e.services.iter().map(|r| r.workers).collect();
        assert_eq!(counts, vec![1, 1, 100]);
    }

    #[test]
    fn invalid_schedule_rolls_the_batch_back() {
        let mut e = engine();
        let err = e
            .add(vec![
                noop().with_tag("fine"),
                noop().with_tag("broken").with_every("not a schedule"),
            ])
            .unwrap_err();
        assert!(matches!(err, EngineError::Schedule { ref tag, .. } if tag == "broken"));
        assert!(e.services.is_empty());
        assert!(e.tags.is_empty());
        assert_eq!(e.ordinal, 0);
    }

    #[test]
    fn failed_add_does_not_advance_the_port_cursor() {
        let mut e = engine();
        let err = e
            .add(vec![noop().with_tag("dup"), noop().with_tag("dup")])
            .unwrap_err();
        assert!(matches!(err, EngineError::TagExists { .. }));

        // The failed batch allocated a port while staging; a truly rolled
        // back call still hands the next service a base from the untouched
        // cursor, not one a gap further up.
        e.add(vec![noop().with_tag("ok")]).unwrap();
        assert!(u32::from(e.services[0].base_port) < 1024 + 1000);
    }

    #[test]
    fn base_ports_are_distinct_per_service() {
        let mut e = engine();
        e.add(vec![noop().with_tag("a"), noop().with_tag("b")])
            .unwrap();
        let a = e.services[0].base_port;
        let b = e.services[1].base_port;
        assert_ne!(a, b);
        // Replica offsets never reach the next base.
        assert!(u32::from(b) > u32::from(a) + 100);
    }

    #[test]
    fn assemble_orders_workers_and_offsets_ports() {
        let mut e = engine();
        e.add(vec![
            noop().with_tag("a").with_workers(2),
            noop().with_tag("b"),
        ])
        .unwrap();

        let mux = LogMux::new(Box::new(Vec::<u8>::new()), false, true);
        let (hub_tx, _hub_rx) = mpsc::unbounded_channel();
        let planned = e.assemble(&mux, &None, &hub_tx).unwrap();

        let sids: Vec<&str> = planned.iter().map(|w| w.actor.sid.as_str()).collect();
        assert_eq!(sids, vec!["a.1", "a.2", "b.1"]);

        let base_a = e.services[0].base_port;
        let base_b = e.services[1].base_port;
        let ports: Vec<u16> = planned.iter().map(|w| w.actor.port).collect();
        assert_eq!(ports, vec![base_a + 1, base_a + 2, base_b + 1]);

        let mut dedup = ports.clone();
        dedup.sort_unstable();
        dedup.dedup();
        assert_eq!(dedup.len(), ports.len());
    }

    #[test]
    fn env_rejects_bad_keys_before_setting_anything() {
        let mut e = engine();
        let mut envs = HashMap::new();
        envs.insert("PROCVISOR_TEST_GOOD".to_string(), "1".to_string());
        envs.insert("BAD=KEY".to_string(), "2".to_string());

        let err = e.env(&envs).unwrap_err();
        assert!(matches!(err, EngineError::Env { .. }));
        assert!(std::env::var("PROCVISOR_TEST_GOOD").is_err());

        envs.remove("BAD=KEY");
        e.env(&envs).unwrap();
        assert_eq!(std::env::var("PROCVISOR_TEST_GOOD").unwrap(), "1");
    }
}
