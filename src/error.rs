//! Failure taxonomy for one execution request.

use crate::sandbox::Stream;
use thiserror::Error;

/// Everything that can go wrong between receiving a snippet and producing
/// a result. The executor turns each variant into result content.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("No Python code provided")]
    EmptyCode,
    #[error("invalid session id {0:?}")]
    InvalidSession(String),
    #[error("{0}")]
    Launch(String),
    #[error("execution exceeded {0} seconds")]
    Timeout(u64),
    #[error("{0} exceeded the output limit")]
    OutputTooLarge(Stream),
}

impl ExecError {
    pub fn is_validation(&self) -> bool {
        matches!(self, ExecError::EmptyCode | ExecError::InvalidSession(_))
    }
}

impl From<std::io::Error> for ExecError {
    fn from(err: std::io::Error) -> Self {
        ExecError::Launch(err.to_string())
    }
}
