//! Signal-driven shutdown, isolated in its own test binary because it
//! raises process-wide signals.

#![cfg(unix)]

mod common;

use std::time::Duration;

use nix::sys::signal::{raise, Signal as NixSignal};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

use common::RecordSink;
use procvisor::{CodeError, Engine, Service};

#[tokio::test(flavor = "multi_thread")]
async fn sighup_terminates_children_and_notifies_callbacks() {
    let sink = RecordSink::new();
    let root = CancellationToken::new();
    let mut engine = Engine::new(root.clone());
    engine.set_logger(sink.clone());

    engine
        .add(vec![
            Service::exec("sleep 5").with_tag("s").with_workers(2),
            Service::code_fn(|ctx| async move {
                ctx.recv().await;
                if let Some(sig) = ctx.last_signal() {
                    ctx.println(format!("signalled: {sig}"));
                }
                Ok::<_, CodeError>(())
            })
            .with_tag("watch"),
        ])
        .unwrap();

    let handle = tokio::spawn(engine.run());

    // Give the hub time to register its listeners and the children to spawn.
    sleep(Duration::from_millis(600)).await;
    raise(NixSignal::SIGHUP).expect("raise SIGHUP");

    timeout(Duration::from_secs(3), handle)
        .await
        .expect("run should return well before the sleeps finish")
        .unwrap()
        .unwrap();

    let watched = sink.payloads_for("watch.1");
    assert!(
        watched.iter().any(|p| p == "signalled: terminate"),
        "callback should observe the delivery, got {watched:?}"
    );
}
