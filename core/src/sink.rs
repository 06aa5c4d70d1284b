//! # Output Sink
//!
//! The single place worker results become user-visible output. Each
//! report is formatted up front and written under one lock acquisition,
//! so two concurrent reports can never interleave their bytes. There is
//! no ordering guarantee across reports; whichever worker takes the lock
//! first prints first.

use std::io::{self, Write};
use std::sync::Mutex;

use colored::Colorize;

use crate::session::CommandOutput;

/// What one worker iteration produced for one host.
pub enum ReportBody {
    Success(CommandOutput),
    Timeout,
    AuthenticationFailed,
    Fatal { detail: String },
}

pub struct OutputSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl OutputSink {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(writer)),
        }
    }

    /// Writes one complete record, tagged with the reporting worker and
    /// the host it processed. Atomic with respect to concurrent reports.
    pub fn report(&self, worker_id: usize, host: &str, body: &ReportBody) {
        let record: String = render(worker_id, host, body);
        let mut out = self.out.lock().unwrap();
        let _ = out.write_all(record.as_bytes());
        let _ = out.flush();
    }
}

fn render(worker_id: usize, host: &str, body: &ReportBody) -> String {
    let tag: String = format!(
        "{} {}",
        format!("[worker {worker_id}]").bright_black(),
        host.cyan().bold()
    );

    match body {
        ReportBody::Success(output) => {
            let mut record = format!("{tag} {}\n", "ok".green().bold());
            match output {
                CommandOutput::Raw(text) => {
                    for line in text.lines() {
                        record.push_str("  ");
                        record.push_str(line);
                        record.push('\n');
                    }
                }
                CommandOutput::Records(records) => {
                    for (idx, fields) in records.iter().enumerate() {
                        record.push_str(&format!("  [{idx}]\n"));
                        for (key, value) in fields {
                            record.push_str(&format!("    {key}: {value}\n"));
                        }
                    }
                }
            }
            record
        }
        ReportBody::Timeout => {
            format!("{tag} {}\n", "timed out, skipping".yellow().bold())
        }
        ReportBody::AuthenticationFailed => {
            format!(
                "{tag} {}\n",
                "authentication failed, aborting run".red().bold()
            )
        }
        ReportBody::Fatal { detail } => {
            format!("{tag} {} {detail}\n", "fatal:".red().bold())
        }
    }
}
