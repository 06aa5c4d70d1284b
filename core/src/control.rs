//! Cooperative run control.
//!
//! Replaces "daemon workers plus a self-delivered signal" with a shared
//! flag checked at every suspension point. `request_stop` is ordinary
//! teardown after a drain; `raise_abort` is the fatal path and implies
//! stop. The first abort reason wins; later ones are dropped.

use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Why the run was aborted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AbortReason {
    /// A host rejected the shared credentials. Treated as systemic:
    /// the same login is wrong for the whole fleet.
    AuthenticationFailed { host: String },
    /// An unclassified session failure, escalated rather than swallowed.
    SessionFailure { host: String, detail: String },
    /// A worker task died without completing its iteration. Its dequeued
    /// host would never be marked done, so the run cannot drain.
    WorkerFailure { detail: String },
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthenticationFailed { host } => {
                write!(f, "authentication failed for {host}")
            }
            Self::SessionFailure { host, detail } => {
                write!(f, "session failure for {host}: {detail}")
            }
            Self::WorkerFailure { detail } => {
                write!(f, "worker task failed: {detail}")
            }
        }
    }
}

pub struct RunControl {
    stopped: AtomicBool,
    aborted: AtomicBool,
    reason: Mutex<Option<AbortReason>>,
    changed: Notify,
}

impl RunControl {
    pub fn new() -> Self {
        Self {
            stopped: AtomicBool::new(false),
            aborted: AtomicBool::new(false),
            reason: Mutex::new(None),
            changed: Notify::new(),
        }
    }

    /// Ordinary teardown: workers exit at their next suspension point.
    pub fn request_stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
        self.changed.notify_waiters();
    }

    /// Fatal path: records the first reason, sets the abort flag and stops
    /// the pool.
    pub fn raise_abort(&self, reason: AbortReason) {
        {
            let mut slot = self.reason.lock().unwrap();
            if slot.is_none() {
                *slot = Some(reason);
            }
        }
        self.aborted.store(true, Ordering::Relaxed);
        self.request_stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Relaxed)
    }

    pub fn abort_reason(&self) -> Option<AbortReason> {
        self.reason.lock().unwrap().clone()
    }

    /// Resolves once stop (or abort) has been requested.
    pub async fn stopped(&self) {
        loop {
            // Register with the Notify before checking the flag, so a
            // notify_waiters landing in between is not lost.
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_stopped() {
                return;
            }
            notified.await;
        }
    }

    /// Resolves once the abort flag is raised. Used by the dispatcher to
    /// race drain completion against a fatal failure.
    pub async fn aborted(&self) {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_aborted() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new()
    }
}
