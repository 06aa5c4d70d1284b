use std::time::Duration;

/// Settings for one fan-out run, shared read-only by every worker.
pub struct RunConfig {
    /// Number of concurrent workers draining the host queue.
    pub workers: usize,
    /// The single command executed against every host.
    pub command: String,
    /// Device kind hint passed to the session adapter (e.g. "cisco_ios").
    pub device_kind: String,
    /// Per-session timeout for connect, auth and command execution.
    pub timeout: Duration,
    /// Suppresses the banner and completion markers.
    ///
    /// Does not suppress per-host records.
    pub quiet: bool,
}
