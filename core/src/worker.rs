//! Worker loop and failure classification.
//!
//! One long-lived loop per pool slot. Each iteration dequeues a host,
//! builds connection parameters from the shared credentials, attempts a
//! session and routes the outcome to the sink. `mark_done` fires exactly
//! once per dequeue, on every path, so drain accounting stays honest.
//!
//! Branch policy: a timeout is host-local and skipped; an authentication
//! failure is treated as a fleet-wide credential problem and aborts the
//! run; unclassified failures are reported and then abort as well, never
//! swallowed.

use std::sync::Arc;
use std::time::Duration;

use fleetrun_common::credentials::Credentials;
use fleetrun_common::error::SessionError;
use tracing::{debug, trace, warn};

use crate::control::{AbortReason, RunControl};
use crate::queue::WorkQueue;
use crate::session::{ConnectParams, SessionFactory};
use crate::sink::{OutputSink, ReportBody};

/// Everything a worker touches, passed in at spawn time. The credentials
/// are read-only shared; the queue, sink and control each own their own
/// synchronization. No process-wide globals.
#[derive(Clone)]
pub struct WorkerContext {
    pub queue: Arc<WorkQueue>,
    pub sink: Arc<OutputSink>,
    pub factory: Arc<dyn SessionFactory>,
    pub credentials: Arc<Credentials>,
    pub command: Arc<str>,
    pub device_kind: Arc<str>,
    pub timeout: Duration,
    pub control: Arc<RunControl>,
}

/// Runs until the dispatcher raises the stop signal. Never self-terminates
/// on an empty queue; more work may still arrive before the queue is
/// declared drained.
pub async fn run(worker_id: usize, ctx: WorkerContext) {
    loop {
        if ctx.control.is_stopped() {
            break;
        }
        trace!(worker_id, "waiting for host");
        // Biased so a raised stop flag wins over pending work; nothing is
        // dequeued after an abort.
        let host: String = tokio::select! {
            biased;
            _ = ctx.control.stopped() => break,
            host = ctx.queue.dequeue() => host,
        };
        debug!(worker_id, %host, "acquired host");

        process_host(worker_id, &ctx, &host).await;
        ctx.queue.mark_done();
    }
    trace!(worker_id, "stopping");
}

/// One iteration: establish, execute, report, close.
async fn process_host(worker_id: usize, ctx: &WorkerContext, host: &str) {
    let params = ConnectParams::new(host, &ctx.credentials, &*ctx.device_kind, ctx.timeout);

    let mut session = match ctx.factory.establish(&params).await {
        Ok(session) => session,
        Err(SessionError::Timeout) => {
            ctx.sink.report(worker_id, host, &ReportBody::Timeout);
            return;
        }
        Err(SessionError::AuthenticationFailed) => {
            ctx.sink
                .report(worker_id, host, &ReportBody::AuthenticationFailed);
            ctx.control.raise_abort(AbortReason::AuthenticationFailed {
                host: host.to_owned(),
            });
            return;
        }
        Err(SessionError::Other(detail)) => {
            ctx.sink.report(
                worker_id,
                host,
                &ReportBody::Fatal {
                    detail: detail.clone(),
                },
            );
            ctx.control.raise_abort(AbortReason::SessionFailure {
                host: host.to_owned(),
                detail,
            });
            return;
        }
    };

    match session.execute(&ctx.command).await {
        Ok(output) => {
            ctx.sink
                .report(worker_id, host, &ReportBody::Success(output));
        }
        Err(SessionError::Timeout) => {
            ctx.sink.report(worker_id, host, &ReportBody::Timeout);
        }
        Err(err) => {
            let detail: String = err.to_string();
            warn!(worker_id, %host, %err, "command execution failed");
            ctx.sink.report(
                worker_id,
                host,
                &ReportBody::Fatal {
                    detail: detail.clone(),
                },
            );
            ctx.control.raise_abort(AbortReason::SessionFailure {
                host: host.to_owned(),
                detail,
            });
        }
    }

    session.close().await;
}
