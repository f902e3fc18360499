//! Caller-facing execution result.

use crate::error::ExecError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    /// Exit 0 but the shim output could not be parsed; raw text returned.
    ProtocolFallback,
    SandboxFailure,
    Timeout,
    OutputTooLarge,
    LaunchFailure,
    ValidationFailure,
}

impl ExecutionStatus {
    /// Whether the snippet ran to completion inside the sandbox.
    pub fn is_completed(self) -> bool {
        matches!(self, ExecutionStatus::Success | ExecutionStatus::ProtocolFallback)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text {
        text: String,
    },
    Image {
        /// Base64-encoded image bytes.
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text { text } => Some(text),
            Content::Image { .. } => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Content::Image { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    pub content: Vec<Content>,
}

impl ExecutionResult {
    pub fn new(status: ExecutionStatus, content: Vec<Content>) -> Self {
        Self { status, content }
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(Content::as_text)
    }

    pub fn images(&self) -> impl Iterator<Item = &Content> {
        self.content.iter().filter(|c| c.is_image())
    }
}

impl From<ExecError> for ExecutionResult {
    fn from(err: ExecError) -> Self {
        let (status, text) = match &err {
            ExecError::EmptyCode | ExecError::InvalidSession(_) => {
                (ExecutionStatus::ValidationFailure, format!("Error: {}", err))
            }
            ExecError::Launch(reason) => (
                ExecutionStatus::LaunchFailure,
                format!("✗ Error executing code: {}", reason),
            ),
            ExecError::Timeout(secs) => (
                ExecutionStatus::Timeout,
                format!("✗ Execution timed out after {} seconds", secs),
            ),
            ExecError::OutputTooLarge(_) => (
                ExecutionStatus::OutputTooLarge,
                "Error: Output size exceeds maximum limit".to_string(),
            ),
        };
        ExecutionResult::new(status, vec![Content::text(text)])
    }
}
