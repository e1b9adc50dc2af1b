//! Output formatting utilities for CLI commands

use colored::Colorize;
use tsbench_iotdb::Status;

/// Print success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print one operation outcome, with the failing text when there is one
pub fn status(status: &Status) {
    if status.success {
        success(&status.to_string());
        return;
    }
    error(&status.to_string());
    if let Some(query) = &status.query {
        eprintln!("    {}", query.dimmed());
    }
}

/// Section heading
pub fn heading(title: &str) {
    println!("\n{}", title.bold());
}
