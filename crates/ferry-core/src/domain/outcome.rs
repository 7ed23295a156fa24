//! Outcome model: the result a command reports after running.
//!
//! The consumer uses it for the success/fail decision, the dispatcher uses
//! it for output hooks (write to file, email).

use serde::{Deserialize, Serialize};

/// Outcome of one command execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub successful: bool,

    #[serde(default)]
    pub message: String,

    /// Captured stdout-equivalent output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl CommandResult {
    pub fn success() -> Self {
        Self {
            successful: true,
            message: String::new(),
            output: None,
        }
    }

    pub fn success_with(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::success()
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            successful: false,
            message: message.into(),
            output: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Text used by output hooks: the captured output, else the message.
    pub fn output_text(&self) -> Option<&str> {
        match (&self.output, self.message.is_empty()) {
            (Some(output), _) => Some(output),
            (None, false) => Some(&self.message),
            (None, true) => None,
        }
    }
}

impl Default for CommandResult {
    fn default() -> Self {
        Self::success()
    }
}
