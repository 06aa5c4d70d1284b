//! The remote-session **abstraction** the engine depends on.
//!
//! Workers never touch a concrete SSH client; they see only these traits.
//! Establishing a session, running the command and closing are the whole
//! contract, and every failure arrives pre-classified as a
//! [`SessionError`]. Concrete adapters live outside this crate
//! (`fleetrun-ssh`), and tests substitute scripted fakes.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use fleetrun_common::credentials::Credentials;
use fleetrun_common::error::SessionError;

/// Everything needed to reach one host, built per dequeue from the shared
/// credentials and the dequeued host identifier.
pub struct ConnectParams {
    pub host: String,
    pub credentials: Credentials,
    pub device_kind: String,
    pub timeout: Duration,
}

impl ConnectParams {
    pub fn new(
        host: impl Into<String>,
        credentials: &Credentials,
        device_kind: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            host: host.into(),
            credentials: credentials.clone(),
            device_kind: device_kind.into(),
            timeout,
        }
    }
}

/// Successful command output: raw text, or records when the adapter can
/// parse the device's reply into structured form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandOutput {
    Raw(String),
    Records(Vec<BTreeMap<String, String>>),
}

/// Opens sessions. Shared by every worker in the pool.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn establish(
        &self,
        params: &ConnectParams,
    ) -> Result<Box<dyn RemoteSession>, SessionError>;
}

/// One established session to one host.
#[async_trait]
pub trait RemoteSession: Send {
    /// Runs the command and captures its output.
    async fn execute(&mut self, command: &str) -> Result<CommandOutput, SessionError>;

    /// Best-effort disconnect. Failures are logged by the adapter, never
    /// surfaced.
    async fn close(&mut self);
}
