//! Tool error types.
//!
//! Tool bodies return [`ToolError`]; the registry maps every variant to a
//! failed outcome, so these never propagate past the dispatch boundary.

use std::io;

use thiserror::Error;

/// Errors that can occur inside a tool body.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Arguments were structurally valid but semantically unusable.
    #[error("invalid parameters: {message}")]
    InvalidParameters {
        /// Description of the problem.
        message: String,
    },

    /// A named resource the tool was asked to operate on does not exist.
    #[error("not found: {message}")]
    NotFound {
        /// Description of what was missing.
        message: String,
    },

    /// Generic I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Any other execution failure.
    #[error("{message}")]
    Failed {
        /// Description of the failure.
        message: String,
    },
}

impl ToolError {
    /// An [`InvalidParameters`](ToolError::InvalidParameters) error.
    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::InvalidParameters {
            message: message.into(),
        }
    }

    /// A [`NotFound`](ToolError::NotFound) error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// A generic [`Failed`](ToolError::Failed) error.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}
