//! Session failure taxonomy.
//!
//! Every failure coming out of the session adapter is classified into one
//! of three kinds, because the worker pool reacts differently to each:
//! a timeout is host-local and skipped, an authentication failure is
//! treated as a systemic credential problem and aborts the whole run, and
//! anything unclassified is escalated rather than swallowed.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// The host did not respond within the configured window.
    #[error("connection timed out")]
    Timeout,

    /// The host rejected the supplied credentials.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Anything the adapter could not classify.
    #[error("session failure: {0}")]
    Other(String),
}

impl SessionError {
    pub fn other(detail: impl Into<String>) -> Self {
        Self::Other(detail.into())
    }
}
