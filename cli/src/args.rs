use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use fleetrun_common::config::RunConfig;

#[derive(Parser)]
#[command(name = "fleetrun")]
#[command(about = "Run one command across a fleet of hosts over SSH.")]
pub struct CommandLine {
    /// Path to the host list, one address or name per line
    #[arg(short = 'H', long)]
    pub hosts: PathBuf,

    /// Login username, shared by every host
    #[arg(short, long)]
    pub username: String,

    /// The command to execute on every host
    #[arg(short, long)]
    pub command: String,

    /// Number of concurrent workers
    #[arg(short, long, default_value_t = 8)]
    pub workers: usize,

    /// Device kind hint for the session adapter
    #[arg(short, long, default_value = "cisco_ios")]
    pub device_kind: String,

    /// Per-session timeout in seconds (connect, auth and execution)
    #[arg(short, long, default_value_t = 10)]
    pub timeout: u64,

    /// Suppress the banner and completion markers
    #[arg(short, long)]
    pub quiet: bool,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn to_config(&self) -> RunConfig {
        RunConfig {
            workers: self.workers,
            command: self.command.clone(),
            device_kind: self.device_kind.clone(),
            timeout: Duration::from_secs(self.timeout),
            quiet: self.quiet,
        }
    }
}
