//! Shared types used across the bridge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Tool invocation / result
// ---------------------------------------------------------------------------

/// A single tool call delivered by the protocol layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Stable failure categories surfaced to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnknownTool,
    InvalidArguments,
    Unreachable,
    AuthRejected,
    Timeout,
    RemoteError,
    NotFound,
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTool => write!(f, "unknown_tool"),
            Self::InvalidArguments => write!(f, "invalid_arguments"),
            Self::Unreachable => write!(f, "unreachable"),
            Self::AuthRejected => write!(f, "auth_rejected"),
            Self::Timeout => write!(f, "timeout"),
            Self::RemoteError => write!(f, "remote_error"),
            Self::NotFound => write!(f, "not_found"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Outcome of one tool invocation. Exactly one variant per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ToolResult {
    Success {
        payload: serde_json::Value,
    },
    Failure {
        kind: FailureKind,
        message: String,
    },
}

impl ToolResult {
    pub fn success(payload: serde_json::Value) -> Self {
        Self::Success { payload }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The failure kind, if this is a failure.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }

    pub fn payload(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Success { payload } => Some(payload),
            Self::Failure { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Job lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle state of a remote job, as reported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Successful,
    Failed,
    Canceled,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Successful => write!(f, "successful"),
            Self::Failed => write!(f, "failed"),
            Self::Canceled => write!(f, "canceled"),
        }
    }
}

impl JobStatus {
    /// Map a controller status string onto the local lifecycle.
    ///
    /// The controller distinguishes `new`, `pending` and `waiting`; all of
    /// them are "not started yet" here. `error` is a failure.
    pub fn from_remote(status: &str) -> Option<Self> {
        match status.trim().to_ascii_lowercase().as_str() {
            "new" | "pending" | "waiting" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "successful" => Some(Self::Successful),
            "failed" | "error" => Some(Self::Failed),
            "canceled" | "cancelled" => Some(Self::Canceled),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Successful | Self::Failed | Self::Canceled)
    }
}

/// Local record of a job launched through this bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobHandle {
    pub job_id: String,
    pub template_id: String,
    pub submitted_at: DateTime<Utc>,
    pub status: JobStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn remote_statuses_map_onto_lifecycle() {
        assert_eq!(JobStatus::from_remote("new"), Some(JobStatus::Pending));
        assert_eq!(JobStatus::from_remote("waiting"), Some(JobStatus::Pending));
        assert_eq!(JobStatus::from_remote("Running"), Some(JobStatus::Running));
        assert_eq!(JobStatus::from_remote("error"), Some(JobStatus::Failed));
        assert_eq!(JobStatus::from_remote("canceled"), Some(JobStatus::Canceled));
        assert_eq!(JobStatus::from_remote("exploded"), None);
    }

    #[test]
    fn only_finished_states_are_terminal() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Successful.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Canceled.is_terminal());
    }

    #[test]
    fn tool_result_serializes_tagged() {
        let ok = ToolResult::success(json!({"reachable": true}));
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"outcome": "success", "payload": {"reachable": true}})
        );

        let err = ToolResult::failure(FailureKind::NotFound, "job 9 not found");
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"outcome": "failure", "kind": "not_found", "message": "job 9 not found"})
        );
        assert_eq!(err.failure_kind(), Some(FailureKind::NotFound));
        assert!(err.payload().is_none());
    }
}
