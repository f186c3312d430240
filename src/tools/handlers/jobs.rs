//! Job tools: list, poll status, fetch stdout, and list locally tracked jobs.

use crate::controller::{collect_pages, ApiRequest, Transport, TransportError};
use crate::jobs::JobTracker;
use crate::tools::handlers::handle_summary;
use crate::tools::schema::{Arguments, ParamSpec};
use crate::tools::traits::{ToolDescriptor, ToolError, ToolHandler};
use crate::types::JobStatus;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// Largest page the controller will serve.
const MAX_PAGE_SIZE: i64 = 200;

/// Largest `limit` accepted by `list_jobs`.
const MAX_LIST_LIMIT: i64 = 1000;

/// Status strings accepted by the controller's job list filter.
const REMOTE_STATUSES: &[&str] = &[
    "new",
    "pending",
    "waiting",
    "running",
    "successful",
    "failed",
    "error",
    "canceled",
];

// ---------------------------------------------------------------------------
// list_jobs
// ---------------------------------------------------------------------------

pub struct ListJobs {
    descriptor: ToolDescriptor,
    transport: Arc<dyn Transport>,
}

impl ListJobs {
    pub const NAME: &'static str = "list_jobs";

    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            descriptor: ToolDescriptor::new(
                Self::NAME,
                "List jobs, most recent first. Pagination is handled internally.",
                vec![
                    ParamSpec::integer("limit", "Maximum number of jobs to return")
                        .optional()
                        .range(1, MAX_LIST_LIMIT),
                    ParamSpec::string("status", "Only return jobs in this controller status")
                        .optional()
                        .one_of(REMOTE_STATUSES),
                ],
            ),
            transport,
        }
    }
}

#[async_trait]
impl ToolHandler for ListJobs {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, args: Arguments) -> Result<Value, ToolError> {
        let limit = args.i64("limit");
        let page_size = limit.map_or(MAX_PAGE_SIZE, |l| l.min(MAX_PAGE_SIZE));

        let mut request = ApiRequest::get("jobs/")
            .query("order_by", "-id")
            .query("page_size", page_size);
        if let Some(status) = args.str("status") {
            request = request.query("status", status);
        }

        let collected = collect_pages(
            self.transport.as_ref(),
            request,
            limit.map(|l| l as usize),
        )
        .await?;

        debug!(
            "list_jobs returned {} jobs (remote total {:?})",
            collected.items.len(),
            collected.count
        );
        Ok(json!({
            "count": collected.items.len(),
            "remote_count": collected.count,
            "truncated": collected.truncated,
            "jobs": collected.items,
        }))
    }
}

// ---------------------------------------------------------------------------
// get_job_status
// ---------------------------------------------------------------------------

pub struct GetJobStatus {
    descriptor: ToolDescriptor,
    transport: Arc<dyn Transport>,
    tracker: JobTracker,
}

impl GetJobStatus {
    pub const NAME: &'static str = "get_job_status";

    pub fn new(transport: Arc<dyn Transport>, tracker: JobTracker) -> Self {
        Self {
            descriptor: ToolDescriptor::new(
                Self::NAME,
                "Get the current status and metadata of a job by id.",
                vec![ParamSpec::id("job_id", "Job id")],
            ),
            transport,
            tracker,
        }
    }
}

#[async_trait]
impl ToolHandler for GetJobStatus {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, args: Arguments) -> Result<Value, ToolError> {
        let job_id = args.require_str("job_id")?;

        // Always ask the controller; the tracker is only a local cache.
        let job: Value = self
            .transport
            .send(ApiRequest::get(format!("jobs/{job_id}/")))
            .await?
            .json()?;

        let remote_status = job
            .get("status")
            .and_then(Value::as_str)
            .ok_or_else(|| TransportError::InvalidResponse(format!("job {job_id} has no status")))?;
        let status = JobStatus::from_remote(remote_status).ok_or_else(|| {
            TransportError::InvalidResponse(format!(
                "job {job_id} has unrecognized status '{remote_status}'"
            ))
        })?;

        let tracked = self.tracker.update(job_id, status).await;
        debug!(
            "Polled job {}: {} (tracked: {})",
            job_id,
            status,
            tracked.is_some()
        );

        Ok(json!({
            "job_id": job_id,
            "status": status,
            "remote_status": remote_status,
            "finished": status.is_terminal(),
            "tracked": tracked.as_ref().map(handle_summary),
            "job": job,
        }))
    }
}

// ---------------------------------------------------------------------------
// get_job_stdout
// ---------------------------------------------------------------------------

pub struct GetJobStdout {
    descriptor: ToolDescriptor,
    transport: Arc<dyn Transport>,
}

impl GetJobStdout {
    pub const NAME: &'static str = "get_job_stdout";

    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            descriptor: ToolDescriptor::new(
                Self::NAME,
                "Fetch a job's stdout as plain text.",
                vec![ParamSpec::id("job_id", "Job id")],
            ),
            transport,
        }
    }
}

#[async_trait]
impl ToolHandler for GetJobStdout {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, args: Arguments) -> Result<Value, ToolError> {
        let job_id = args.require_str("job_id")?;
        let resp = self
            .transport
            .send(ApiRequest::get(format!("jobs/{job_id}/stdout/")).query("format", "txt"))
            .await?;

        Ok(json!({
            "job_id": job_id,
            "stdout": resp.body,
        }))
    }
}

// ---------------------------------------------------------------------------
// list_tracked_jobs
// ---------------------------------------------------------------------------

pub struct ListTrackedJobs {
    descriptor: ToolDescriptor,
    tracker: JobTracker,
}

impl ListTrackedJobs {
    pub const NAME: &'static str = "list_tracked_jobs";

    pub fn new(tracker: JobTracker) -> Self {
        Self {
            descriptor: ToolDescriptor::new(
                Self::NAME,
                "List jobs launched through this session with their last polled status. No controller call is made.",
                Vec::new(),
            ),
            tracker,
        }
    }
}

#[async_trait]
impl ToolHandler for ListTrackedJobs {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, _args: Arguments) -> Result<Value, ToolError> {
        let handles: Vec<Value> = self.tracker.list().await.iter().map(handle_summary).collect();
        Ok(json!({
            "count": handles.len(),
            "jobs": handles,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::pagination::MAX_PAGES;
    use crate::controller::RawResponse;
    use crate::testing::ScriptedTransport;
    use crate::tools::dispatcher::Dispatcher;
    use crate::tools::handlers::templates::LaunchJobTemplate;
    use crate::tools::registry::ToolRegistry;
    use crate::types::{FailureKind, JobHandle, ToolInvocation};
    use chrono::Utc;
    use std::time::Duration;

    fn setup(transport: ScriptedTransport) -> (Dispatcher, Arc<ScriptedTransport>, JobTracker) {
        let transport = Arc::new(transport);
        let tracker = JobTracker::new();
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(ListJobs::new(transport.clone()))).unwrap();
        reg.register(Arc::new(GetJobStatus::new(transport.clone(), tracker.clone())))
            .unwrap();
        reg.register(Arc::new(GetJobStdout::new(transport.clone()))).unwrap();
        reg.register(Arc::new(ListTrackedJobs::new(tracker.clone()))).unwrap();
        reg.register(Arc::new(LaunchJobTemplate::new(transport.clone(), tracker.clone())))
            .unwrap();
        (Dispatcher::new(Arc::new(reg)), transport, tracker)
    }

    fn page(next: Option<&str>, ids: [u64; 2]) -> Result<RawResponse, TransportError> {
        Ok(RawResponse::json_ok(&json!({
            "count": 6,
            "next": next,
            "previous": null,
            "results": [{"id": ids[0]}, {"id": ids[1]}]
        })))
    }

    fn three_pages() -> ScriptedTransport {
        ScriptedTransport::new()
            .route("jobs/", page(Some("/api/v2/jobs/?order_by=-id&page=2"), [60, 50]))
            .route(
                "/api/v2/jobs/?order_by=-id&page=2",
                page(Some("/api/v2/jobs/?order_by=-id&page=3"), [40, 30]),
            )
            .route("/api/v2/jobs/?order_by=-id&page=3", page(None, [20, 10]))
    }

    #[tokio::test]
    async fn list_jobs_flattens_pages() {
        let (d, transport, _) = setup(three_pages());

        let result = d.dispatch(ToolInvocation::new(ListJobs::NAME, json!({}))).await;
        let payload = result.payload().unwrap();

        assert_eq!(payload["count"], 6);
        assert_eq!(
            payload["jobs"],
            json!([{"id": 60}, {"id": 50}, {"id": 40}, {"id": 30}, {"id": 20}, {"id": 10}])
        );
        assert!(payload.get("next").is_none());
        assert_eq!(transport.calls(), 3);
        assert_eq!(transport.requests()[0].query_value("order_by"), Some("-id"));
    }

    #[tokio::test]
    async fn list_jobs_limit_is_enforced_client_side() {
        let (d, transport, _) = setup(three_pages());

        let result = d
            .dispatch(ToolInvocation::new(ListJobs::NAME, json!({"limit": 3, "status": "failed"})))
            .await;
        let payload = result.payload().unwrap();
        assert_eq!(payload["jobs"], json!([{"id": 60}, {"id": 50}, {"id": 40}]));

        let first = &transport.requests()[0];
        assert_eq!(first.query_value("page_size"), Some("3"));
        assert_eq!(first.query_value("status"), Some("failed"));
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn list_jobs_reports_page_cap() {
        let mut transport = ScriptedTransport::new().route(
            "jobs/",
            Ok(RawResponse::json_ok(&json!({
                "count": 100000,
                "next": "/api/v2/jobs/?page=2",
                "results": [{"id": 1}]
            }))),
        );
        for n in 2..=MAX_PAGES + 1 {
            transport = transport.route(
                &format!("/api/v2/jobs/?page={n}"),
                Ok(RawResponse::json_ok(&json!({
                    "count": 100000,
                    "next": format!("/api/v2/jobs/?page={}", n + 1),
                    "results": [{"id": n}]
                }))),
            );
        }
        let (d, transport, _) = setup(transport);

        let result = d.dispatch(ToolInvocation::new(ListJobs::NAME, json!({}))).await;
        let payload = result.payload().unwrap();
        assert_eq!(payload["count"], MAX_PAGES);
        assert_eq!(payload["remote_count"], 100000);
        assert_eq!(payload["truncated"], true);
        assert_eq!(transport.calls(), MAX_PAGES);
    }

    #[tokio::test]
    async fn complete_listing_is_not_truncated() {
        let (d, _, _) = setup(three_pages());
        let result = d.dispatch(ToolInvocation::new(ListJobs::NAME, json!({}))).await;
        let payload = result.payload().unwrap();
        assert_eq!(payload["truncated"], false);
        assert_eq!(payload["remote_count"], 6);
    }

    #[tokio::test]
    async fn launch_then_poll_updates_tracked_status() {
        let (d, _, tracker) = setup(
            ScriptedTransport::new()
                .route(
                    "job_templates/42/launch/",
                    Ok(RawResponse::json_ok(&json!({"job": "job-7", "status": "pending"}))),
                )
                .route(
                    "jobs/job-7/",
                    Ok(RawResponse::json_ok(&json!({"id": "job-7", "status": "running"}))),
                ),
        );

        let launched = d
            .dispatch(ToolInvocation::new(LaunchJobTemplate::NAME, json!({"template_id": 42})))
            .await;
        assert!(launched.is_success());
        assert_eq!(tracker.get("job-7").await.unwrap().status, JobStatus::Pending);

        let polled = d
            .dispatch(ToolInvocation::new(GetJobStatus::NAME, json!({"job_id": "job-7"})))
            .await;
        let payload = polled.payload().unwrap();
        assert_eq!(payload["status"], "running");
        assert_eq!(payload["remote_status"], "running");
        assert_eq!(payload["finished"], false);
        assert_eq!(payload["tracked"]["status"], "running");
        assert_eq!(tracker.get("job-7").await.unwrap().status, JobStatus::Running);
    }

    #[tokio::test]
    async fn concurrent_poll_of_other_job_leaves_handle_alone() {
        let (d, _, tracker) = setup(
            ScriptedTransport::new()
                .route(
                    "jobs/job-7/",
                    Ok(RawResponse::json_ok(&json!({"status": "running"}))),
                )
                .route(
                    "jobs/job-8/",
                    Ok(RawResponse::json_ok(&json!({"status": "failed"}))),
                )
                .delay("jobs/job-8/", Duration::from_millis(20)),
        );
        for id in ["job-7", "job-8"] {
            tracker
                .record(JobHandle {
                    job_id: id.into(),
                    template_id: "42".into(),
                    submitted_at: Utc::now(),
                    status: JobStatus::Pending,
                })
                .await;
        }

        let (a, b) = tokio::join!(
            d.dispatch(ToolInvocation::new(GetJobStatus::NAME, json!({"job_id": "job-7"}))),
            d.dispatch(ToolInvocation::new(GetJobStatus::NAME, json!({"job_id": "job-8"}))),
        );
        assert!(a.is_success() && b.is_success());
        assert_eq!(tracker.get("job-7").await.unwrap().status, JobStatus::Running);
        assert_eq!(tracker.get("job-8").await.unwrap().status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn poll_of_untracked_job_still_queries_controller() {
        let (d, transport, tracker) = setup(ScriptedTransport::new().route(
            "jobs/77/",
            Ok(RawResponse::json_ok(&json!({"id": 77, "status": "successful"}))),
        ));

        let result = d
            .dispatch(ToolInvocation::new(GetJobStatus::NAME, json!({"job_id": 77})))
            .await;
        let payload = result.payload().unwrap();
        assert_eq!(payload["status"], "successful");
        assert_eq!(payload["finished"], true);
        assert_eq!(payload["tracked"], Value::Null);
        assert_eq!(transport.calls(), 1);
        assert!(tracker.is_empty().await);
    }

    #[tokio::test]
    async fn terminal_state_is_still_polled_remotely() {
        let (d, transport, tracker) = setup(ScriptedTransport::new().route(
            "jobs/5/",
            Ok(RawResponse::json_ok(&json!({"status": "successful"}))),
        ));
        tracker
            .record(JobHandle {
                job_id: "5".into(),
                template_id: "1".into(),
                submitted_at: Utc::now(),
                status: JobStatus::Successful,
            })
            .await;

        for _ in 0..2 {
            d.dispatch(ToolInvocation::new(GetJobStatus::NAME, json!({"job_id": 5})))
                .await;
        }
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn poll_timeout_surfaces_once() {
        let (d, transport, tracker) = setup(ScriptedTransport::new().route(
            "jobs/3/",
            Err(TransportError::Timeout(Duration::from_secs(30))),
        ));

        let result = d
            .dispatch(ToolInvocation::new(GetJobStatus::NAME, json!({"job_id": 3})))
            .await;
        assert_eq!(result.failure_kind(), Some(FailureKind::Timeout));
        assert_eq!(transport.calls(), 1);
        assert!(tracker.is_empty().await);
    }

    #[tokio::test]
    async fn unknown_remote_job_is_not_found() {
        let (d, _, _) = setup(ScriptedTransport::new());
        let result = d
            .dispatch(ToolInvocation::new(GetJobStatus::NAME, json!({"job_id": 404})))
            .await;
        assert_eq!(result.failure_kind(), Some(FailureKind::NotFound));
    }

    #[tokio::test]
    async fn stdout_is_returned_as_text() {
        let (d, transport, _) = setup(ScriptedTransport::new().route(
            "jobs/9/stdout/",
            Ok(RawResponse::new(200, "PLAY [all] ****\nok: [web1]\n")),
        ));

        let result = d
            .dispatch(ToolInvocation::new(GetJobStdout::NAME, json!({"job_id": 9})))
            .await;
        assert_eq!(
            result.payload().unwrap(),
            &json!({"job_id": "9", "stdout": "PLAY [all] ****\nok: [web1]\n"})
        );
        assert_eq!(transport.requests()[0].query_value("format"), Some("txt"));
    }

    #[tokio::test]
    async fn tracked_jobs_are_listed_without_network() {
        let (d, transport, tracker) = setup(ScriptedTransport::new());
        tracker
            .record(JobHandle {
                job_id: "1".into(),
                template_id: "42".into(),
                submitted_at: Utc::now(),
                status: JobStatus::Running,
            })
            .await;

        let result = d
            .dispatch(ToolInvocation::new(ListTrackedJobs::NAME, json!({})))
            .await;
        let payload = result.payload().unwrap();
        assert_eq!(payload["count"], 1);
        assert_eq!(payload["jobs"][0]["status"], "running");
        assert_eq!(transport.calls(), 0);
    }
}
