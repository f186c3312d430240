//! In-memory registry of jobs launched through the bridge.
//!
//! The tracker is a local convenience: the controller stays the source of
//! truth for job state, and nothing here survives a restart.

use crate::types::{JobHandle, JobStatus};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Process-lifetime map of job id to last-known handle.
#[derive(Debug, Clone, Default)]
pub struct JobTracker {
    jobs: Arc<Mutex<HashMap<String, JobHandle>>>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly launched job. Re-recording an id replaces the handle.
    pub async fn record(&self, handle: JobHandle) {
        debug!(
            "Tracking job {} (template {}, {})",
            handle.job_id, handle.template_id, handle.status
        );
        let mut jobs = self.jobs.lock().await;
        jobs.insert(handle.job_id.clone(), handle);
    }

    pub async fn get(&self, job_id: &str) -> Option<JobHandle> {
        self.jobs.lock().await.get(job_id).cloned()
    }

    /// Store the status from the most recently completed poll.
    ///
    /// Returns the updated handle, or `None` if the job is not tracked.
    pub async fn update(&self, job_id: &str, status: JobStatus) -> Option<JobHandle> {
        let mut jobs = self.jobs.lock().await;
        let handle = jobs.get_mut(job_id)?;

        if handle.status.is_terminal() && handle.status != status {
            warn!(
                "Job {} moved from terminal state {} to {}",
                job_id, handle.status, status
            );
        }
        handle.status = status;
        Some(handle.clone())
    }

    /// All tracked handles, oldest submission first.
    pub async fn list(&self) -> Vec<JobHandle> {
        let jobs = self.jobs.lock().await;
        let mut handles: Vec<JobHandle> = jobs.values().cloned().collect();
        handles.sort_by(|a, b| {
            a.submitted_at
                .cmp(&b.submitted_at)
                .then_with(|| a.job_id.cmp(&b.job_id))
        });
        handles
    }

    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn handle(job_id: &str, template_id: &str) -> JobHandle {
        JobHandle {
            job_id: job_id.into(),
            template_id: template_id.into(),
            submitted_at: Utc::now(),
            status: JobStatus::Pending,
        }
    }

    #[tokio::test]
    async fn record_then_get() {
        let tracker = JobTracker::new();
        assert!(tracker.get("job-7").await.is_none());

        tracker.record(handle("job-7", "42")).await;
        let got = tracker.get("job-7").await.unwrap();
        assert_eq!(got.template_id, "42");
        assert_eq!(got.status, JobStatus::Pending);
        assert_eq!(tracker.len().await, 1);
    }

    #[tokio::test]
    async fn update_unknown_job_is_none() {
        let tracker = JobTracker::new();
        assert!(tracker.update("nope", JobStatus::Running).await.is_none());
        assert!(tracker.is_empty().await);
    }

    #[tokio::test]
    async fn last_update_wins() {
        let tracker = JobTracker::new();
        tracker.record(handle("1", "42")).await;

        tracker.update("1", JobStatus::Running).await;
        tracker.update("1", JobStatus::Successful).await;
        assert_eq!(tracker.get("1").await.unwrap().status, JobStatus::Successful);

        // The controller is authoritative even if a terminal state reverts.
        tracker.update("1", JobStatus::Running).await;
        assert_eq!(tracker.get("1").await.unwrap().status, JobStatus::Running);
    }

    #[tokio::test]
    async fn updates_are_per_job() {
        let tracker = JobTracker::new();
        tracker.record(handle("a", "1")).await;
        tracker.record(handle("b", "1")).await;

        let t1 = tracker.clone();
        let t2 = tracker.clone();
        let (ra, rb) = tokio::join!(
            async move { t1.update("a", JobStatus::Running).await },
            async move { t2.update("b", JobStatus::Failed).await },
        );
        assert_eq!(ra.unwrap().status, JobStatus::Running);
        assert_eq!(rb.unwrap().status, JobStatus::Failed);
        assert_eq!(tracker.get("a").await.unwrap().status, JobStatus::Running);
        assert_eq!(tracker.get("b").await.unwrap().status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn list_is_ordered_by_submission() {
        let tracker = JobTracker::new();
        let mut late = handle("late", "1");
        late.submitted_at = Utc::now() + Duration::seconds(10);
        tracker.record(late).await;
        tracker.record(handle("early", "1")).await;

        let ids: Vec<String> = tracker.list().await.into_iter().map(|h| h.job_id).collect();
        assert_eq!(ids, vec!["early".to_string(), "late".to_string()]);
    }
}
