//! Maps raw sandbox output to an [`ExecutionResult`].
//!
//! Pure: no process management, no I/O.

use crate::protocol::{self, OutputRecord};
use crate::result::{Content, ExecutionResult, ExecutionStatus};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

const NO_OUTPUT: &str = "✓ Execution successful (no output)";

pub fn translate(exit_code: i32, stdout: &[u8], stderr: &[u8]) -> ExecutionResult {
    if exit_code != 0 {
        let error_output = String::from_utf8_lossy(stderr);
        return ExecutionResult::new(
            ExecutionStatus::SandboxFailure,
            vec![Content::text(format!(
                "✗ Docker execution failed:\n\n```\n{}\n```",
                error_output
            ))],
        );
    }

    let output = String::from_utf8_lossy(stdout);
    match protocol::decode(&output) {
        Ok(records) => ExecutionResult::new(ExecutionStatus::Success, render(records)),
        Err(e) => {
            debug!(error = %e, "shim output is not a record array, returning raw text");
            ExecutionResult::new(
                ExecutionStatus::ProtocolFallback,
                vec![Content::text(format!(
                    "✓ Execution completed:\n\n```\n{}\n```",
                    output
                ))],
            )
        }
    }
}

fn render(records: Vec<OutputRecord>) -> Vec<Content> {
    let mut text = String::new();
    let mut images = Vec::new();

    for record in &records {
        match record {
            OutputRecord::Text(data) => text.push_str(data),
            OutputRecord::Error(data) => {
                text.push_str("ERROR: ");
                text.push_str(data);
                text.push('\n');
            }
            OutputRecord::Image(bytes) => {
                if let Some(mime_type) = record.mime_type() {
                    images.push(Content::Image {
                        data: STANDARD.encode(bytes),
                        mime_type: mime_type.to_string(),
                    });
                }
            }
        }
    }

    let mut content = Vec::with_capacity(images.len() + 1);
    let text = text.trim();
    if !text.is_empty() {
        content.push(Content::text(text));
    }
    content.extend(images);

    if content.is_empty() {
        content.push(Content::text(NO_OUTPUT));
    }
    content
}
