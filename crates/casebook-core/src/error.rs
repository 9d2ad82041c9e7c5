//! Error types for the `casebook-core` crate.

use thiserror::Error;

/// Errors produced by the core case pipeline.
#[derive(Debug, Error)]
pub enum CaseError {
    /// A caller-supplied parameter was rejected before any adapter call.
    #[error("invalid {field}: {message}")]
    Validation {
        /// The offending parameter name.
        field: &'static str,
        /// What was wrong and what is accepted.
        message: String,
    },

    /// A single case document could not be parsed.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Source path of the document.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// The embedding backend failed.
    #[error("embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The vector index backend failed.
    #[error("vector index error ({backend}): {message}")]
    Index {
        /// The index backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },
}

impl CaseError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// True for errors raised by the embedding or index collaborators.
    pub fn is_adapter_error(&self) -> bool {
        matches!(self, Self::Embedding { .. } | Self::Index { .. })
    }
}

/// A convenience result type for core operations.
pub type Result<T> = std::result::Result<T, CaseError>;
