//! Pure formatting functions for UI output.
//!
//! This module contains all display/formatting logic separated from user interaction.

use console::style;

use crate::boundary::BoundaryWarning;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✔").green(), style(message).green());
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), style(message).cyan().underlined());
}

/// Format and print a plain informational line.
pub fn display_info(message: &str) {
    println!("{}", style(message).cyan());
}

/// Format and print a failed step.
pub fn display_step_failed(label: &str, reason: &str) {
    eprintln!("{} {}: {}", style("✘").red(), style(label).red(), reason);
}

/// Display a boundary warning to the user.
pub fn display_boundary_warning(warning: &BoundaryWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
}

/// Render a numbered list of choices, one per line.
pub fn format_choices(choices: &[String]) -> String {
    choices
        .iter()
        .enumerate()
        .map(|(i, choice)| format!("  {}. {}", i + 1, choice))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a bulleted list of dependency names.
pub fn format_dependencies<'a>(dependencies: impl IntoIterator<Item = &'a String>) -> String {
    dependencies
        .into_iter()
        .map(|dep| format!("   - {}", dep))
        .collect::<Vec<_>>()
        .join("\n")
}
