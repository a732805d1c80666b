//! Graph-store error types.

use thiserror::Error;

/// Errors from the graph store. The retriever degrades these to an empty
/// result set; only the coordinator's facility ranking surfaces them.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("graph store unreachable: {0}")]
    Unreachable(String),

    #[error("graph store returned status {status}")]
    Status { status: u16 },

    #[error("graph query failed ({code}): {message}")]
    Query { code: String, message: String },

    #[error("unexpected result shape: {0}")]
    Shape(String),
}

/// Convenience alias.
pub type StoreResult<T> = Result<T, StoreError>;

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            StoreError::Status {
                status: status.as_u16(),
            }
        } else {
            StoreError::Unreachable(err.to_string())
        }
    }
}
