//! Error taxonomy for generation and extraction.

use thiserror::Error;

/// Errors surfaced by the generation client and the structured extractor.
///
/// Callers with a documented deterministic fallback catch all variants
/// locally; callers whose output *is* the requested value propagate them
/// unchanged.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Endpoint unreachable or the request timed out.
    #[error("generation endpoint unavailable: {0}")]
    Unavailable(String),

    /// Endpoint responded with a non-success status.
    #[error("generation request failed with status {status}")]
    Failed { status: u16 },

    /// Model output is not recoverable JSON even after fence stripping and
    /// control-character cleanup. Carries prefixes of both forms for
    /// operator diagnosis.
    #[error("model output is not valid JSON (original: {original_prefix:?}, cleaned: {cleaned_prefix:?})")]
    Extraction {
        original_prefix: String,
        cleaned_prefix: String,
    },

    /// Parsed JSON lacks required keys or has the wrong shape.
    #[error("model output failed validation: {0}")]
    Validation(String),
}

/// Convenience alias.
pub type LlmResult<T> = Result<T, LlmError>;

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            LlmError::Failed {
                status: status.as_u16(),
            }
        } else {
            LlmError::Unavailable(err.to_string())
        }
    }
}
