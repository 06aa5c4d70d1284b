use colored::*;

pub const TOTAL_WIDTH: usize = 64;

/// Bannered section header, e.g. `──⟦ STARTING RUN ⟧──`.
pub fn header(msg: &str, quiet: bool) {
    if quiet {
        return;
    }

    let formatted: String = format!("⟦ {} ⟧", msg);
    let msg_len: usize = formatted.chars().count();

    let dash_count: usize = TOTAL_WIDTH.saturating_sub(msg_len);
    let left: usize = dash_count / 2;
    let right: usize = dash_count - left;

    let line: ColoredString = format!(
        "{}{}{}",
        "─".repeat(left),
        formatted.to_uppercase().bright_green(),
        "─".repeat(right)
    )
    .bright_black();

    println!("{}", line);
}

pub fn fat_separator(quiet: bool) {
    if quiet {
        return;
    }
    let sep: ColoredString = "═".repeat(TOTAL_WIDTH).bright_black();
    println!("{}", sep);
}

/// Completion marker for a fully drained run.
pub fn run_complete(hosts: usize, quiet: bool) {
    if quiet {
        return;
    }
    fat_separator(false);
    let unit: &str = if hosts == 1 { "host" } else { "hosts" };
    println!(
        "{} {}",
        "*** run complete:".green().bold(),
        format!("{hosts} {unit} processed").bold()
    );
}

/// Clearly marked failure outcome for an aborted run.
pub fn run_aborted(reason: &str) {
    fat_separator(false);
    println!(
        "{} {}",
        "*** run aborted:".red().bold(),
        reason.to_string().bold()
    );
}
