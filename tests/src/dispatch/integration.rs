#![cfg(test)]
//! End-to-end dispatcher runs against a scripted session factory.
//!
//! The fake factory plays back one scripted outcome per host, records
//! every establish and close, and lets the tests check the run-level
//! policy: timeouts skip, authentication failures abort, everything is
//! accounted for exactly once.

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fleetrun_common::credentials::Credentials;
use fleetrun_common::error::SessionError;
use fleetrun_core::control::AbortReason;
use fleetrun_core::dispatcher::{self, RunOutcome, RunSpec};
use fleetrun_core::session::{CommandOutput, ConnectParams, RemoteSession, SessionFactory};
use fleetrun_core::sink::OutputSink;

/// Scripted outcome for one host.
#[derive(Clone)]
enum Script {
    Succeed,
    TimeoutOnConnect,
    TimeoutOnExecute,
    AuthFail,
    OtherFail(&'static str),
    PanicOnConnect,
}

struct FakeFactory {
    scripts: HashMap<String, Script>,
    established: AtomicUsize,
    closed: Arc<AtomicUsize>,
}

impl FakeFactory {
    fn new(scripts: &[(&str, Script)]) -> Arc<Self> {
        Arc::new(Self {
            scripts: scripts
                .iter()
                .map(|(host, script)| ((*host).to_owned(), script.clone()))
                .collect(),
            established: AtomicUsize::new(0),
            closed: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// All hosts succeed.
    fn all_ok() -> Arc<Self> {
        Self::new(&[])
    }
}

#[async_trait]
impl SessionFactory for FakeFactory {
    async fn establish(
        &self,
        params: &ConnectParams,
    ) -> Result<Box<dyn RemoteSession>, SessionError> {
        // A touch of latency so pooled workers actually overlap.
        tokio::time::sleep(Duration::from_millis(2)).await;

        let script = self
            .scripts
            .get(&params.host)
            .cloned()
            .unwrap_or(Script::Succeed);

        match script {
            Script::TimeoutOnConnect => Err(SessionError::Timeout),
            Script::AuthFail => Err(SessionError::AuthenticationFailed),
            Script::PanicOnConnect => panic!("wedged session library"),
            Script::OtherFail(detail) => Err(SessionError::other(detail)),
            Script::Succeed | Script::TimeoutOnExecute => {
                self.established.fetch_add(1, Ordering::Relaxed);
                Ok(Box::new(FakeSession {
                    host: params.host.clone(),
                    script,
                    closed: self.closed.clone(),
                }))
            }
        }
    }
}

struct FakeSession {
    host: String,
    script: Script,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl RemoteSession for FakeSession {
    async fn execute(&mut self, command: &str) -> Result<CommandOutput, SessionError> {
        match self.script {
            Script::TimeoutOnExecute => Err(SessionError::Timeout),
            _ => Ok(CommandOutput::Raw(format!("{} ran '{command}'", self.host))),
        }
    }

    async fn close(&mut self) {
        self.closed.fetch_add(1, Ordering::Relaxed);
    }
}

/// In-memory sink target the tests can read back.
#[derive(Clone)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(Vec::new())))
    }

    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }

    fn count(&self, needle: &str) -> usize {
        self.contents().matches(needle).count()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn spec(pool_size: usize) -> RunSpec {
    RunSpec {
        pool_size,
        command: "show inventory".to_owned(),
        device_kind: "cisco_ios".to_owned(),
        timeout: Duration::from_secs(1),
    }
}

fn creds() -> Credentials {
    Credentials::new("jimmy", "hunter2")
}

fn hosts(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("10.0.0.{i}")).collect()
}

async fn run_with(
    host_list: Vec<String>,
    pool_size: usize,
    factory: Arc<FakeFactory>,
) -> (RunOutcome, SharedBuf) {
    colored::control::set_override(false);
    let buf = SharedBuf::new();
    let sink = Arc::new(OutputSink::new(buf.clone()));
    let outcome = dispatcher::run(host_list, spec(pool_size), creds(), factory, sink)
        .await
        .expect("dispatcher failed");
    (outcome, buf)
}

#[tokio::test]
async fn full_successful_run_conserves_every_host() {
    let factory = FakeFactory::all_ok();
    let (outcome, buf) = run_with(hosts(16), 4, factory.clone()).await;

    assert!(matches!(outcome, RunOutcome::Completed { hosts: 16 }));
    assert_eq!(buf.count(" ok\n"), 16, "one success record per host");
    assert_eq!(factory.closed.load(Ordering::Relaxed), 16, "every session closed");
}

#[tokio::test]
async fn two_hosts_two_workers_both_succeed() {
    let factory = FakeFactory::all_ok();
    let (outcome, buf) =
        run_with(vec!["10.0.0.1".to_owned(), "10.0.0.2".to_owned()], 2, factory).await;

    assert!(matches!(outcome, RunOutcome::Completed { hosts: 2 }));
    assert_eq!(buf.count(" ok\n"), 2);
}

#[tokio::test]
async fn single_host_timeout_still_completes() {
    let factory = FakeFactory::new(&[("10.0.0.1", Script::TimeoutOnConnect)]);
    let (outcome, buf) = run_with(vec!["10.0.0.1".to_owned()], 2, factory).await;

    assert!(matches!(outcome, RunOutcome::Completed { hosts: 1 }));
    assert_eq!(buf.count("timed out"), 1);
}

#[tokio::test]
async fn timeout_on_one_host_does_not_block_the_rest() {
    let factory = FakeFactory::new(&[("10.0.0.3", Script::TimeoutOnConnect)]);
    let (outcome, buf) = run_with(hosts(5), 2, factory).await;

    assert!(matches!(outcome, RunOutcome::Completed { hosts: 5 }));
    assert_eq!(buf.count(" ok\n"), 4, "remaining hosts still processed");
    assert_eq!(buf.count("timed out"), 1);
}

#[tokio::test]
async fn execute_timeout_is_skipped_and_session_closed() {
    let factory = FakeFactory::new(&[("10.0.0.2", Script::TimeoutOnExecute)]);
    let (outcome, buf) = run_with(hosts(3), 2, factory.clone()).await;

    assert!(matches!(outcome, RunOutcome::Completed { hosts: 3 }));
    assert_eq!(buf.count(" ok\n"), 2);
    assert_eq!(buf.count("timed out"), 1);
    assert_eq!(
        factory.closed.load(Ordering::Relaxed),
        3,
        "the timed-out session was established and must still be closed"
    );
}

#[tokio::test]
async fn auth_failure_on_first_host_aborts_the_run() {
    let factory = FakeFactory::new(&[("10.0.0.1", Script::AuthFail)]);
    let (outcome, buf) =
        run_with(vec!["10.0.0.1".to_owned(), "10.0.0.2".to_owned()], 2, factory).await;

    match outcome {
        RunOutcome::Aborted {
            reason: AbortReason::AuthenticationFailed { host },
        } => assert_eq!(host, "10.0.0.1"),
        other => panic!("expected auth abort, got {other:?}"),
    }
    assert_eq!(buf.count("authentication failed"), 1);
}

#[tokio::test]
async fn auth_failure_position_does_not_matter() {
    // Last host in the list, single worker: the abort fires after every
    // other host already succeeded.
    let factory = FakeFactory::new(&[("10.0.0.4", Script::AuthFail)]);
    let (outcome, buf) = run_with(hosts(4), 1, factory).await;

    assert!(matches!(outcome, RunOutcome::Aborted { .. }));
    assert_eq!(buf.count(" ok\n"), 3);
    assert_eq!(buf.count("authentication failed"), 1);
}

#[tokio::test]
async fn unclassified_failure_aborts_and_is_reported() {
    let factory = FakeFactory::new(&[("10.0.0.2", Script::OtherFail("wedged tty"))]);
    let (outcome, buf) = run_with(hosts(2), 2, factory).await;

    match outcome {
        RunOutcome::Aborted {
            reason: AbortReason::SessionFailure { host, detail },
        } => {
            assert_eq!(host, "10.0.0.2");
            assert!(detail.contains("wedged tty"));
        }
        other => panic!("expected session-failure abort, got {other:?}"),
    }
    assert_eq!(buf.count("fatal:"), 1, "never swallowed silently");
}

#[tokio::test]
async fn crashed_worker_aborts_the_run_instead_of_hanging() {
    // The crashed worker never marks its host done, so the queue can
    // never drain; the dispatcher must notice the dead task and abort.
    let factory = FakeFactory::new(&[("10.0.0.2", Script::PanicOnConnect)]);
    let run = run_with(hosts(3), 2, factory);
    let (outcome, _buf) = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("dispatcher hung on a crashed worker");

    match outcome {
        RunOutcome::Aborted {
            reason: AbortReason::WorkerFailure { detail },
        } => assert!(detail.contains("panic"), "unexpected detail: {detail}"),
        other => panic!("expected worker-failure abort, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_host_list_drains_immediately() {
    for pool_size in [1, 4, 8] {
        let factory = FakeFactory::all_ok();
        let run = run_with(Vec::new(), pool_size, factory);
        let (outcome, buf) = tokio::time::timeout(Duration::from_secs(2), run)
            .await
            .expect("dispatcher hung on an empty host list");

        assert!(matches!(outcome, RunOutcome::Completed { hosts: 0 }));
        assert!(buf.contents().is_empty());
    }
}

#[tokio::test]
async fn pool_of_one_processes_everything_sequentially() {
    let factory = FakeFactory::all_ok();
    let (outcome, buf) = run_with(hosts(6), 1, factory).await;

    assert!(matches!(outcome, RunOutcome::Completed { hosts: 6 }));
    assert_eq!(buf.count(" ok\n"), 6);
}
