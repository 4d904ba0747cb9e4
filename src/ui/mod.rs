//! User interface module - progress reporting, prompts and formatting.
//!
//! Separates concerns:
//! - `formatter` - Pure formatting functions
//! - `scripted` - A sink with canned answers for tests
//! - This module - The [ProgressSink] capability and its terminal implementation

use std::io::{self, BufRead, Write};

use crate::boundary::BoundaryWarning;
use crate::error::{ReleaseError, Result};

pub mod formatter;
pub mod scripted;

pub use formatter::{
    display_boundary_warning, display_error, display_info, display_status, display_step_failed,
    display_success, format_choices, format_dependencies,
};
pub use scripted::{Answer, ScriptedSink, SinkEvent};

/// Where the orchestrator reports progress and asks questions.
///
/// The sink never drives the workflow; it only shows what happens and
/// returns the user's answers.
pub trait ProgressSink {
    /// An operation labelled `label` is about to run
    fn step_started(&self, label: &str);

    /// The running operation finished; `label` describes the result
    fn step_succeeded(&self, label: &str);

    /// The operation labelled `label` failed
    fn step_failed(&self, label: &str, error: &ReleaseError);

    fn info(&self, message: &str);

    fn warn(&self, warning: &BoundaryWarning);

    /// Yes/no question, `default` is used on empty input
    fn confirm(&self, message: &str, default: bool) -> Result<bool>;

    /// Pick exactly one of `choices`
    fn select(&self, message: &str, choices: &[String]) -> Result<String>;

    /// Pick any number of `choices`, in the order they should be applied
    fn multi_select(&self, message: &str, choices: &[String]) -> Result<Vec<String>>;
}

/// Parse a 1-based selection; empty input picks the first choice.
pub fn parse_selection(input: &str, len: usize) -> Result<usize> {
    let input = input.trim();
    let index = if input.is_empty() {
        1
    } else {
        input.parse::<usize>().unwrap_or(0)
    };

    if index > 0 && index <= len {
        Ok(index - 1)
    } else {
        Err(ReleaseError::prompt(format!("Invalid selection '{}'", input)))
    }
}

/// Parse a comma or space separated list of 1-based selections.
///
/// Keeps the order the user typed and drops repeats. Empty input selects
/// nothing.
pub fn parse_multi_selection(input: &str, len: usize) -> Result<Vec<usize>> {
    let mut picked = Vec::new();

    for token in input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        let index = parse_selection(token, len)?;
        if !picked.contains(&index) {
            picked.push(index);
        }
    }

    Ok(picked)
}

/// Interprets a yes/no answer, falling back to `default` on empty input.
pub fn parse_confirmation(input: &str, default: bool) -> bool {
    match input.trim().to_lowercase().as_str() {
        "" => default,
        "y" | "yes" => true,
        _ => false,
    }
}

/// Progress sink writing to the terminal and reading answers from stdin
#[derive(Debug, Default)]
pub struct TerminalSink;

impl TerminalSink {
    pub fn new() -> Self {
        TerminalSink
    }

    fn read_answer(prompt: &str) -> Result<String> {
        print!("{}", prompt);
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().lock().read_line(&mut input)?;
        Ok(input)
    }
}

impl ProgressSink for TerminalSink {
    fn step_started(&self, label: &str) {
        display_status(&format!("{}...", label));
    }

    fn step_succeeded(&self, label: &str) {
        display_success(label);
    }

    fn step_failed(&self, label: &str, error: &ReleaseError) {
        display_step_failed(label, &error.to_string());
    }

    fn info(&self, message: &str) {
        display_info(message);
    }

    fn warn(&self, warning: &BoundaryWarning) {
        display_boundary_warning(warning);
    }

    fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        let hint = if default { "Y/n" } else { "y/N" };
        let input = Self::read_answer(&format!("\n{} ({}): ", message, hint))?;
        Ok(parse_confirmation(&input, default))
    }

    fn select(&self, message: &str, choices: &[String]) -> Result<String> {
        if choices.is_empty() {
            return Err(ReleaseError::prompt("Nothing to select"));
        }

        println!("\n{}", console::style(message).bold());
        println!("{}", format_choices(choices));

        let input = Self::read_answer(&format!(
            "\nSelect one (1-{}) [default: 1]: ",
            choices.len()
        ))?;
        let index = parse_selection(&input, choices.len())?;
        Ok(choices[index].clone())
    }

    fn multi_select(&self, message: &str, choices: &[String]) -> Result<Vec<String>> {
        println!("\n{}", console::style(message).bold());
        println!("{}", format_choices(choices));

        let input = Self::read_answer(&format!(
            "\nSelect in order, separated by commas (1-{}): ",
            choices.len()
        ))?;
        let picked = parse_multi_selection(&input, choices.len())?;
        Ok(picked.into_iter().map(|i| choices[i].clone()).collect())
    }
}
