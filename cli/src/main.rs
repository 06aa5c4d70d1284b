mod args;
mod terminal;

use std::process::ExitCode;
use std::sync::Arc;

use args::CommandLine;
use colored::Colorize;
use fleetrun_common::config::RunConfig;
use fleetrun_common::credentials::Credentials;
use fleetrun_common::hosts;
use fleetrun_core::dispatcher::{self, RunOutcome, RunSpec};
use fleetrun_core::sink::OutputSink;
use fleetrun_ssh::SshSessionFactory;
use terminal::print;
use tracing::error;

/// Exit code for an aborted run, distinct from ordinary setup failures.
const EXIT_ABORTED: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let commands = CommandLine::parse_args();

    terminal::logging::init();

    match run(commands).await {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(commands: CommandLine) -> anyhow::Result<ExitCode> {
    let cfg: RunConfig = commands.to_config();
    anyhow::ensure!(cfg.workers >= 1, "--workers must be at least 1");

    let host_list: Vec<String> = hosts::load(&commands.hosts)?;
    let credentials = Credentials::new(commands.username.clone(), read_password()?);

    print::header("starting run", cfg.quiet);

    let spec = RunSpec {
        pool_size: cfg.workers,
        command: cfg.command.clone(),
        device_kind: cfg.device_kind.clone(),
        timeout: cfg.timeout,
    };
    let factory = Arc::new(SshSessionFactory::new());
    let sink = Arc::new(OutputSink::stdout());

    let outcome = dispatcher::run(host_list, spec, credentials, factory, sink).await?;

    match outcome {
        RunOutcome::Completed { hosts } => {
            print::run_complete(hosts, cfg.quiet);
            Ok(ExitCode::SUCCESS)
        }
        RunOutcome::Aborted { reason } => {
            print::run_aborted(&reason.to_string());
            Ok(ExitCode::from(EXIT_ABORTED))
        }
    }
}

/// Obtains the shared password once, before any worker starts. Hidden
/// prompt by default; `FLEETRUN_PASSWORD` overrides it for
/// non-interactive runs. Never echoed, never logged.
fn read_password() -> anyhow::Result<String> {
    if let Ok(password) = std::env::var("FLEETRUN_PASSWORD") {
        return Ok(password);
    }

    let password: String = dialoguer::Password::new()
        .with_prompt("Password".bright_green().to_string())
        .interact()?;
    Ok(password)
}
