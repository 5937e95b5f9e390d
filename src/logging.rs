//! Pretty-printing messages to the console
//!
//! All diagnostics go to standard output, one line per issue.

use colored::Colorize;

/// Pretty-print an error message to the console
pub fn error(error_message: String) {
    let error_title = "error:".red().bold();
    println!("{} {}", error_title, error_message);
}

/// Pretty-print a warning message to the console
pub fn warning(message: String, line_number: usize) {
    let warning = "warning:".yellow().bold();
    println!("{} line {}: {}", warning, line_number, message);
}

/// Pretty-print a closing notice to the console
pub fn note(message: String) {
    let note_title = "note:".cyan().bold();
    println!("{} {}", note_title, message);
}
