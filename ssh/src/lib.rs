//! # SSH Session Adapter
//!
//! Implements the core session port over `ssh2` (libssh2). libssh2 is a
//! blocking library, which matches the engine's model: each worker owns
//! one in-flight session at a time, and every blocking call runs inside
//! `tokio::task::spawn_blocking` so the worker tasks never stall the
//! runtime.
//!
//! Failure classification mirrors the engine's taxonomy: connect/handshake
//! timeouts and libssh2's own timeout code become [`SessionError::Timeout`];
//! rejected credentials become [`SessionError::AuthenticationFailed`];
//! everything else is [`SessionError::Other`].

use std::io::{self, Read};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use async_trait::async_trait;
use fleetrun_common::error::SessionError;
use fleetrun_core::session::{CommandOutput, ConnectParams, RemoteSession, SessionFactory};
use ssh2::{Channel, ErrorCode, Session};
use tracing::{debug, trace};

// Raw libssh2 codes; ssh2 only re-exports them as integers.
const LIBSSH2_ERROR_TIMEOUT: i32 = -9;
const LIBSSH2_ERROR_AUTHENTICATION_FAILED: i32 = -18;

const DEFAULT_SSH_PORT: u16 = 22;

pub struct SshSessionFactory;

impl SshSessionFactory {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SshSessionFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionFactory for SshSessionFactory {
    async fn establish(
        &self,
        params: &ConnectParams,
    ) -> Result<Box<dyn RemoteSession>, SessionError> {
        let host: String = params.host.clone();
        let username: String = params.credentials.username.clone();
        let password: String = params.credentials.password.reveal().to_owned();
        let timeout: Duration = params.timeout;
        trace!(%host, device_kind = %params.device_kind, "establishing session");

        let session: Session = tokio::task::spawn_blocking(move || {
            connect_and_auth(&host, &username, &password, timeout)
        })
        .await
        .map_err(|join_err| SessionError::other(join_err.to_string()))??;

        Ok(Box::new(SshSession {
            session: Some(session),
        }))
    }
}

pub struct SshSession {
    // Taken out for the duration of each blocking call and put back after.
    session: Option<Session>,
}

#[async_trait]
impl RemoteSession for SshSession {
    async fn execute(&mut self, command: &str) -> Result<CommandOutput, SessionError> {
        let session: Session = self
            .session
            .take()
            .ok_or_else(|| SessionError::other("session already closed"))?;
        let command: String = command.to_owned();

        let (session, result) = tokio::task::spawn_blocking(move || {
            let result = run_command(&session, &command);
            (session, result)
        })
        .await
        .map_err(|join_err| SessionError::other(join_err.to_string()))?;

        self.session = Some(session);
        result.map(CommandOutput::Raw)
    }

    async fn close(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let closed = tokio::task::spawn_blocking(move || {
            session.disconnect(None, "command complete", None)
        })
        .await;

        match closed {
            Ok(Ok(())) => trace!("session closed"),
            Ok(Err(err)) => debug!(%err, "disconnect failed, dropping session"),
            Err(join_err) => debug!(%join_err, "disconnect task failed"),
        }
    }
}

fn connect_and_auth(
    host: &str,
    username: &str,
    password: &str,
    timeout: Duration,
) -> Result<Session, SessionError> {
    let addr: SocketAddr = resolve(host)?;
    let tcp: TcpStream = TcpStream::connect_timeout(&addr, timeout).map_err(classify_io)?;

    let mut session = Session::new().map_err(classify_ssh)?;
    session.set_timeout(timeout.as_millis().min(u32::MAX as u128) as u32);
    session.set_tcp_stream(tcp);
    session.handshake().map_err(classify_ssh)?;

    session
        .userauth_password(username, password)
        .map_err(classify_ssh)?;
    if !session.authenticated() {
        return Err(SessionError::AuthenticationFailed);
    }

    Ok(session)
}

fn run_command(session: &Session, command: &str) -> Result<String, SessionError> {
    let mut channel: Channel = session.channel_session().map_err(classify_ssh)?;
    channel.exec(command).map_err(classify_ssh)?;

    let mut output = String::new();
    channel
        .read_to_string(&mut output)
        .map_err(classify_io)?;
    // Best effort; the output is already captured.
    let _ = channel.wait_close();

    Ok(output)
}

/// Resolves `host` (with an optional `:port` suffix) to a socket address.
///
/// Accepts `name`, `name:port`, bare IPv6 (`::1`) and bracketed IPv6 with
/// a port (`[::1]:2222`).
fn resolve(host: &str) -> Result<SocketAddr, SessionError> {
    let candidates = if has_port_suffix(host) {
        host.to_socket_addrs()
    } else {
        (host, DEFAULT_SSH_PORT).to_socket_addrs()
    };

    candidates
        .map_err(|err| SessionError::other(format!("resolving {host}: {err}")))?
        .next()
        .ok_or_else(|| SessionError::other(format!("no address for {host}")))
}

/// A colon only marks a port when there is exactly one (hostname or IPv4
/// form) or when the address part is bracketed; bare IPv6 identifiers
/// like `::1` are host-only.
fn has_port_suffix(host: &str) -> bool {
    let Some((addr, port)) = host.rsplit_once(':') else {
        return false;
    };
    if port.parse::<u16>().is_err() {
        return false;
    }
    match host.matches(':').count() {
        1 => true,
        _ => addr.starts_with('[') && addr.ends_with(']'),
    }
}

fn classify_io(err: io::Error) -> SessionError {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => SessionError::Timeout,
        _ => SessionError::other(err.to_string()),
    }
}

fn classify_ssh(err: ssh2::Error) -> SessionError {
    match err.code() {
        ErrorCode::Session(LIBSSH2_ERROR_TIMEOUT) => SessionError::Timeout,
        ErrorCode::Session(LIBSSH2_ERROR_AUTHENTICATION_FAILED) => {
            SessionError::AuthenticationFailed
        }
        _ => SessionError::other(err.to_string()),
    }
}
