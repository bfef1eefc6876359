//! Pure formatting functions for UI output.
//!
//! Progress goes to stdout; warnings and errors go to stderr.

use console::style;

use crate::diagnostics::Diagnostic;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Print a workflow phase title.
pub fn display_title(message: &str) {
    println!("\n{} {}\n", style("#").cyan().bold(), style(message).bold());
}

/// Echo an external command before it runs.
pub fn display_command(command: &str) {
    println!("{}", style(format!("> {}", command)).dim());
}

/// Display a non-fatal diagnostic on stderr.
pub fn display_diagnostic(diagnostic: &Diagnostic) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), diagnostic);
}
