//! # Dispatcher
//!
//! Owns the pool lifecycle: spawn every worker first, then feed the queue
//! (so no host is ever enqueued into a pool with zero consumers), then
//! wait for drain-or-abort, then tear the pool down and join every
//! worker. Teardown is structured; there are no daemon tasks and no
//! reliance on process exit to reap workers.

use std::sync::Arc;
use std::time::Duration;

use fleetrun_common::credentials::Credentials;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::control::{AbortReason, RunControl};
use crate::queue::WorkQueue;
use crate::session::SessionFactory;
use crate::sink::OutputSink;
use crate::worker::{self, WorkerContext};

/// Per-run parameters handed to [`run`].
pub struct RunSpec {
    pub pool_size: usize,
    pub command: String,
    pub device_kind: String,
    pub timeout: Duration,
}

/// How the run ended. `Aborted` is never reported as success, even though
/// remaining queued hosts were simply abandoned when the flag fired.
#[derive(Debug)]
pub enum RunOutcome {
    Completed { hosts: usize },
    Aborted { reason: AbortReason },
}

/// Fans `hosts` out across `spec.pool_size` workers and blocks until the
/// queue is fully drained or the abort flag fires.
///
/// Tolerates an empty host list (drains immediately) and any pool size of
/// at least one. Consumption order across hosts is unspecified.
pub async fn run(
    hosts: Vec<String>,
    spec: RunSpec,
    credentials: Credentials,
    factory: Arc<dyn SessionFactory>,
    sink: Arc<OutputSink>,
) -> anyhow::Result<RunOutcome> {
    anyhow::ensure!(spec.pool_size >= 1, "pool size must be at least 1");

    let queue = Arc::new(WorkQueue::new());
    let control = Arc::new(RunControl::new());

    let ctx = WorkerContext {
        queue: queue.clone(),
        sink,
        factory,
        credentials: Arc::new(credentials),
        command: Arc::from(spec.command.as_str()),
        device_kind: Arc::from(spec.device_kind.as_str()),
        timeout: spec.timeout,
        control: control.clone(),
    };

    // Workers first, work second.
    let mut workers: JoinSet<()> = JoinSet::new();
    for worker_id in 0..spec.pool_size {
        workers.spawn(worker::run(worker_id, ctx.clone()));
    }
    debug!("spawned {} workers", spec.pool_size);

    let host_count: usize = hosts.len();
    for host in hosts {
        queue.enqueue(host);
    }
    debug!("enqueued {host_count} hosts");

    // A worker task ending before the stop signal means it died; its
    // dequeued host would stay unmarked forever, so the drain wait must
    // not be left racing alone.
    loop {
        tokio::select! {
            _ = queue.await_drained() => {
                info!("queue drained");
                break;
            }
            _ = control.aborted() => {
                let (enqueued, done) = queue.progress();
                debug!(enqueued, done, "abort raised, abandoning remaining hosts");
                break;
            }
            joined = workers.join_next() => {
                match joined {
                    Some(Err(join_err)) => {
                        error!(%join_err, "worker task failed");
                        control.raise_abort(AbortReason::WorkerFailure {
                            detail: join_err.to_string(),
                        });
                        break;
                    }
                    Some(Ok(())) => {}
                    // Pool already empty; nothing left to watch.
                    None => break,
                }
            }
        }
    }

    // In-flight iterations finish (including mark_done); idle workers exit
    // at their next suspension point.
    control.request_stop();
    while let Some(joined) = workers.join_next().await {
        if let Err(join_err) = joined {
            error!(%join_err, "worker task failed during teardown");
            control.raise_abort(AbortReason::WorkerFailure {
                detail: join_err.to_string(),
            });
        }
    }

    match control.abort_reason() {
        Some(reason) => Ok(RunOutcome::Aborted { reason }),
        None => Ok(RunOutcome::Completed { hosts: host_count }),
    }
}
