//! Job template tools: list, create and launch.

use crate::controller::{collect_pages, ApiRequest, Transport, TransportError};
use crate::jobs::JobTracker;
use crate::tools::handlers::{handle_summary, remote_id};
use crate::tools::schema::{Arguments, ParamSpec};
use crate::tools::traits::{ToolDescriptor, ToolError, ToolHandler};
use crate::types::{JobHandle, JobStatus};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::info;

/// Page size requested when listing templates.
const TEMPLATE_PAGE_SIZE: u32 = 100;

// ---------------------------------------------------------------------------
// list_job_templates
// ---------------------------------------------------------------------------

pub struct ListJobTemplates {
    descriptor: ToolDescriptor,
    transport: Arc<dyn Transport>,
}

impl ListJobTemplates {
    pub const NAME: &'static str = "list_job_templates";

    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            descriptor: ToolDescriptor::new(
                Self::NAME,
                "List job templates, optionally filtered by a search term.",
                vec![ParamSpec::string("search", "Free-text search over template names and descriptions")
                    .optional()
                    .non_empty()],
            ),
            transport,
        }
    }
}

#[async_trait]
impl ToolHandler for ListJobTemplates {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, args: Arguments) -> Result<Value, ToolError> {
        let mut request = ApiRequest::get("job_templates/").query("page_size", TEMPLATE_PAGE_SIZE);
        if let Some(search) = args.str("search") {
            request = request.query("search", search);
        }

        let collected = collect_pages(self.transport.as_ref(), request, None).await?;
        Ok(json!({
            "count": collected.items.len(),
            "remote_count": collected.count,
            "truncated": collected.truncated,
            "job_templates": collected.items,
        }))
    }
}

// ---------------------------------------------------------------------------
// create_job_template
// ---------------------------------------------------------------------------

pub struct CreateJobTemplate {
    descriptor: ToolDescriptor,
    transport: Arc<dyn Transport>,
}

impl CreateJobTemplate {
    pub const NAME: &'static str = "create_job_template";

    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            descriptor: ToolDescriptor::new(
                Self::NAME,
                "Create a minimal 'run' job template from a project, inventory and playbook.",
                vec![
                    ParamSpec::string("name", "Template name").non_empty(),
                    ParamSpec::integer("project_id", "Project id").min(1),
                    ParamSpec::integer("inventory_id", "Inventory id").min(1),
                    ParamSpec::string("playbook", "Playbook path within the project").non_empty(),
                ],
            ),
            transport,
        }
    }
}

#[async_trait]
impl ToolHandler for CreateJobTemplate {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, args: Arguments) -> Result<Value, ToolError> {
        let name = args.require_str("name")?;
        let payload = json!({
            "name": name,
            "job_type": "run",
            "project": args.require_i64("project_id")?,
            "inventory": args.require_i64("inventory_id")?,
            "playbook": args.require_str("playbook")?,
        });

        let created: Value = self
            .transport
            .send(ApiRequest::post("job_templates/", payload))
            .await?
            .json()?;

        info!(
            "Created job template '{}' (id {})",
            name,
            created.get("id").and_then(remote_id).unwrap_or_default()
        );
        Ok(created)
    }
}

// ---------------------------------------------------------------------------
// launch_job_template
// ---------------------------------------------------------------------------

pub struct LaunchJobTemplate {
    descriptor: ToolDescriptor,
    transport: Arc<dyn Transport>,
    tracker: JobTracker,
}

impl LaunchJobTemplate {
    pub const NAME: &'static str = "launch_job_template";

    pub fn new(transport: Arc<dyn Transport>, tracker: JobTracker) -> Self {
        Self {
            descriptor: ToolDescriptor::new(
                Self::NAME,
                "Launch a job template and start tracking the resulting job. Supports extra_vars.",
                vec![
                    ParamSpec::id("template_id", "Job template id"),
                    ParamSpec::object("extra_vars", "Extra variables passed to the playbook")
                        .optional(),
                ],
            ),
            transport,
            tracker,
        }
    }
}

#[async_trait]
impl ToolHandler for LaunchJobTemplate {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, args: Arguments) -> Result<Value, ToolError> {
        let template_id = args.require_str("template_id")?;

        let mut payload = Map::new();
        if let Some(vars) = args.object("extra_vars").filter(|v| !v.is_empty()) {
            payload.insert("extra_vars".into(), Value::Object(vars.clone()));
        }

        let launched: Value = self
            .transport
            .send(ApiRequest::post(
                format!("job_templates/{template_id}/launch/"),
                Value::Object(payload),
            ))
            .await?
            .json()?;

        // The launch response names the new job under `job`; some controller
        // versions only set `id`.
        let job_id = launched
            .get("job")
            .and_then(remote_id)
            .or_else(|| launched.get("id").and_then(remote_id))
            .ok_or_else(|| {
                TransportError::InvalidResponse("launch response carries no job id".into())
            })?;

        let status = launched
            .get("status")
            .and_then(Value::as_str)
            .and_then(JobStatus::from_remote)
            .unwrap_or(JobStatus::Pending);

        let handle = JobHandle {
            job_id,
            template_id: template_id.to_string(),
            submitted_at: Utc::now(),
            status,
        };
        self.tracker.record(handle.clone()).await;

        info!(
            "Launched template {} as job {}",
            handle.template_id, handle.job_id
        );
        Ok(handle_summary(&handle))
    }
}
