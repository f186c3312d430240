//! Transport-level failures talking to the controller.

use crate::types::FailureKind;
use std::time::Duration;
use thiserror::Error;

/// Longest response body excerpt carried in an error.
pub const BODY_EXCERPT_LIMIT: usize = 512;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("controller unreachable: {0}")]
    Unreachable(String),

    #[error("controller rejected credentials (HTTP {status})")]
    AuthRejected { status: u16 },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("controller returned HTTP {status}: {body}")]
    RemoteError { status: u16, body: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unexpected controller response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    /// Stable category reported back to the client.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Unreachable(_) => FailureKind::Unreachable,
            Self::AuthRejected { .. } => FailureKind::AuthRejected,
            Self::Timeout(_) => FailureKind::Timeout,
            Self::RemoteError { .. } | Self::InvalidResponse(_) => FailureKind::RemoteError,
            Self::NotFound(_) => FailureKind::NotFound,
        }
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, url: &str, body: &str) -> Self {
        match status {
            401 | 403 => Self::AuthRejected { status },
            404 => Self::NotFound(url.to_string()),
            _ => Self::RemoteError {
                status,
                body: excerpt(body),
            },
        }
    }
}

/// Trim a response body to something fit for an error message.
pub fn excerpt(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() <= BODY_EXCERPT_LIMIT {
        return body.to_string();
    }
    let mut cut: String = body.chars().take(BODY_EXCERPT_LIMIT).collect();
    cut.push_str("...");
    cut
}
