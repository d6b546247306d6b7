// Output formatting and display for CLI

use crate::config::LogTargetConfiguration;
use crate::logs::{Registration, SetupOutcome};
use colored::*;
use std::path::Path;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a formatted table of registrations
pub fn print_registrations(registrations: &[Registration]) {
    if registrations.is_empty() {
        println!("{}", "No targets registered".yellow());
        return;
    }

    #[derive(Tabled)]
    struct RegistrationRow {
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "File")]
        file: String,
        #[tabled(rename = "Min Level")]
        min_level: String,
        #[tabled(rename = "Setup")]
        setup: String,
    }

    let rows: Vec<RegistrationRow> = registrations
        .iter()
        .map(|r| RegistrationRow {
            name: truncate(&r.name, 20),
            file: r.path.display().to_string(),
            min_level: r.min_severity.to_string(),
            setup: format_outcome_colored(&r.setup),
        })
        .collect();

    print_table(Table::new(rows));

    let degraded = registrations.iter().filter(|r| r.setup.is_degraded()).count();
    let summary = format!("Registered: {} target(s)", registrations.len());
    if degraded > 0 {
        println!(
            "{} {}",
            summary.dimmed().italic(),
            format!("({} degraded)", degraded).yellow()
        );
    } else {
        println!("{}", summary.dimmed().italic());
    }
}

/// Print a formatted table of configured targets
pub fn print_targets(targets: &[LogTargetConfiguration]) {
    #[derive(Tabled)]
    struct TargetRow {
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "File")]
        file: String,
        #[tabled(rename = "Filter")]
        filter: String,
        #[tabled(rename = "Min Level")]
        min_level: String,
        #[tabled(rename = "Startup")]
        startup: String,
        #[tabled(rename = "Button")]
        button: String,
    }

    let rows: Vec<TargetRow> = targets
        .iter()
        .map(|t| TargetRow {
            name: truncate(&t.log_name, 20),
            file: t.log_file_path.display().to_string(),
            filter: t.name_filter.clone(),
            min_level: t.min_level.clone(),
            startup: format_flag(t.open_on_start_up).to_string(),
            button: format_flag(t.open_on_button).to_string(),
        })
        .collect();

    print_table(Table::new(rows));
    println!(
        "{}",
        format!("Total: {} target(s)", targets.len()).dimmed().italic()
    );
}

/// Print the result of preparing a single log file
pub fn print_setup_outcome(path: &Path, outcome: &SetupOutcome) {
    println!(
        "{} {}: {}",
        "✓".green().bold(),
        path.display(),
        format_outcome_colored(outcome)
    );
}

fn print_table(mut table: Table) {
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    println!("\n{}\n", table);
}

/// Format a setup outcome with color coding
fn format_outcome_colored(outcome: &SetupOutcome) -> String {
    match outcome {
        SetupOutcome::Created => outcome.to_string().green().to_string(),
        SetupOutcome::Retained { .. } => outcome.to_string(),
        SetupOutcome::Archived { .. } => outcome.to_string().cyan().to_string(),
        SetupOutcome::Degraded(_) => outcome.to_string().red().bold().to_string(),
    }
}

fn format_flag(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "-"
    }
}

/// Truncate a string to a maximum number of characters
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
