pub mod connectivity;
pub mod jobs;
pub mod templates;

pub use connectivity::CheckConnectivity;
pub use jobs::{GetJobStatus, GetJobStdout, ListJobs, ListTrackedJobs};
pub use templates::{CreateJobTemplate, LaunchJobTemplate, ListJobTemplates};

use crate::types::JobHandle;
use serde_json::{json, Value};

/// Read a controller id that may arrive as a number or a string.
pub(crate) fn remote_id(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Client-facing summary of a tracked job.
pub(crate) fn handle_summary(handle: &JobHandle) -> Value {
    json!({
        "job_id": handle.job_id,
        "template_id": handle.template_id,
        "submitted_at": handle.submitted_at.to_rfc3339(),
        "status": handle.status,
    })
}
