//! # Work Queue
//!
//! FIFO of pending hosts with drain accounting. Every `dequeue` must be
//! paired with exactly one `mark_done`, on every outcome path, or
//! `await_drained` never resolves. Consumption order across workers is
//! first-available-wins; nothing may depend on which worker takes which
//! host.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;

struct QueueState {
    pending: VecDeque<String>,
    enqueued: usize,
    done: usize,
}

impl QueueState {
    fn drained(&self) -> bool {
        self.pending.is_empty() && self.done == self.enqueued
    }
}

pub struct WorkQueue {
    state: Mutex<QueueState>,
    item_ready: Notify,
    drain_changed: Notify,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                enqueued: 0,
                done: 0,
            }),
            item_ready: Notify::new(),
            drain_changed: Notify::new(),
        }
    }

    /// Adds one host to the back of the queue. Safe from any concurrent
    /// caller.
    pub fn enqueue(&self, host: String) {
        {
            let mut state = self.state.lock().unwrap();
            state.pending.push_back(host);
            state.enqueued += 1;
        }
        self.item_ready.notify_one();
    }

    /// Removes and returns the oldest pending host, suspending while the
    /// queue is empty. A worker with nothing to do waits here rather than
    /// exiting; more work may still arrive before the queue is declared
    /// drained.
    pub async fn dequeue(&self) -> String {
        loop {
            // The permit must be armed before the emptiness check, or an
            // enqueue landing between check and await is lost.
            let notified = self.item_ready.notified();
            if let Some(host) = self.state.lock().unwrap().pending.pop_front() {
                return host;
            }
            notified.await;
        }
    }

    /// Records that one previously dequeued host finished processing,
    /// whatever the outcome.
    pub fn mark_done(&self) {
        let drained: bool = {
            let mut state = self.state.lock().unwrap();
            state.done += 1;
            debug_assert!(state.done <= state.enqueued, "mark_done without dequeue");
            state.drained()
        };
        if drained {
            self.drain_changed.notify_waiters();
        }
    }

    /// Resolves once every enqueued host has been marked done. Resolves
    /// immediately if the queue is currently drained (including the
    /// never-fed case).
    pub async fn await_drained(&self) {
        loop {
            // Register before checking, so a notify_waiters landing in
            // between is not lost.
            let notified = self.drain_changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.state.lock().unwrap().drained() {
                return;
            }
            notified.await;
        }
    }

    /// Snapshot of (enqueued, done) counts, for outcome reporting.
    pub fn progress(&self) -> (usize, usize) {
        let state = self.state.lock().unwrap();
        (state.enqueued, state.done)
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}
