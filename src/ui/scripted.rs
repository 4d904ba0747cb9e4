//! A [ProgressSink] that answers prompts from a script.
//!
//! Lets the release workflow run unattended in tests while recording what
//! it reported.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::boundary::BoundaryWarning;
use crate::error::{ReleaseError, Result};
use crate::ui::ProgressSink;

/// A canned answer, consumed in order
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Confirm(bool),
    Select(String),
    MultiSelect(Vec<String>),
}

/// Everything the sink was told, in order
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Started(String),
    Succeeded(String),
    Failed(String, String),
    Info(String),
    Warning(BoundaryWarning),
    Prompt(String),
}

#[derive(Debug, Default)]
pub struct ScriptedSink {
    answers: Mutex<VecDeque<Answer>>,
    events: Mutex<Vec<SinkEvent>>,
}

impl ScriptedSink {
    /// A sink that fails every prompt
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answers(answers: impl IntoIterator<Item = Answer>) -> Self {
        ScriptedSink {
            answers: Mutex::new(answers.into_iter().collect()),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Messages of the prompts that were shown
    pub fn prompts(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::Prompt(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn warnings(&self) -> Vec<BoundaryWarning> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::Warning(warning) => Some(warning),
                _ => None,
            })
            .collect()
    }

    /// Whether any recorded event mentions `text`
    pub fn mentions(&self, text: &str) -> bool {
        self.events().iter().any(|event| match event {
            SinkEvent::Started(s)
            | SinkEvent::Succeeded(s)
            | SinkEvent::Info(s)
            | SinkEvent::Prompt(s) => s.contains(text),
            SinkEvent::Failed(label, reason) => label.contains(text) || reason.contains(text),
            SinkEvent::Warning(warning) => warning.to_string().contains(text),
        })
    }

    pub fn unused_answers(&self) -> usize {
        self.answers.lock().map(|a| a.len()).unwrap_or_default()
    }

    fn push(&self, event: SinkEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    fn next_answer(&self, message: &str) -> Result<Answer> {
        self.push(SinkEvent::Prompt(message.to_string()));
        self.answers
            .lock()
            .ok()
            .and_then(|mut answers| answers.pop_front())
            .ok_or_else(|| ReleaseError::prompt(format!("no scripted answer for '{}'", message)))
    }
}

impl ProgressSink for ScriptedSink {
    fn step_started(&self, label: &str) {
        self.push(SinkEvent::Started(label.to_string()));
    }

    fn step_succeeded(&self, label: &str) {
        self.push(SinkEvent::Succeeded(label.to_string()));
    }

    fn step_failed(&self, label: &str, error: &ReleaseError) {
        self.push(SinkEvent::Failed(label.to_string(), error.to_string()));
    }

    fn info(&self, message: &str) {
        self.push(SinkEvent::Info(message.to_string()));
    }

    fn warn(&self, warning: &BoundaryWarning) {
        self.push(SinkEvent::Warning(warning.clone()));
    }

    fn confirm(&self, message: &str, _default: bool) -> Result<bool> {
        match self.next_answer(message)? {
            Answer::Confirm(yes) => Ok(yes),
            other => Err(ReleaseError::prompt(format!(
                "expected a confirmation for '{}', script has {:?}",
                message, other
            ))),
        }
    }

    fn select(&self, message: &str, choices: &[String]) -> Result<String> {
        match self.next_answer(message)? {
            Answer::Select(choice) if choices.contains(&choice) => Ok(choice),
            other => Err(ReleaseError::prompt(format!(
                "expected one of {:?} for '{}', script has {:?}",
                choices, message, other
            ))),
        }
    }

    fn multi_select(&self, message: &str, choices: &[String]) -> Result<Vec<String>> {
        match self.next_answer(message)? {
            Answer::MultiSelect(picked) if picked.iter().all(|p| choices.contains(p)) => {
                Ok(picked)
            }
            other => Err(ReleaseError::prompt(format!(
                "expected a subset of {:?} for '{}', script has {:?}",
                choices, message, other
            ))),
        }
    }
}
