use crate::types::SourceKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RecapError>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RecapError {
    #[error("{source} credentials not configured")]
    Unconfigured { source: SourceKind },

    #[error("{source} API error ({status}): {message}")]
    SourceApi {
        source: SourceKind,
        status: u16,
        message: String,
    },

    #[error("{source} unavailable: {reason}")]
    SourceUnavailable { source: SourceKind, reason: String },

    #[error("Validation error: {0}")]
    Validation(String),
}

impl RecapError {
    pub fn unconfigured(source: SourceKind) -> Self {
        RecapError::Unconfigured { source }
    }

    pub fn api(source: SourceKind, status: u16, message: impl Into<String>) -> Self {
        RecapError::SourceApi {
            source,
            status,
            message: message.into(),
        }
    }

    pub fn unavailable(source: SourceKind, reason: impl Into<String>) -> Self {
        RecapError::SourceUnavailable {
            source,
            reason: reason.into(),
        }
    }

    /// The source this error is attributed to, if any.
    pub fn source_kind(&self) -> Option<SourceKind> {
        match self {
            RecapError::Unconfigured { source }
            | RecapError::SourceApi { source, .. }
            | RecapError::SourceUnavailable { source, .. } => Some(*source),
            RecapError::Validation(_) => None,
        }
    }
}
