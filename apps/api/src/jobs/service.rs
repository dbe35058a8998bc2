//! Job Service: the transactional operations over the job store.
//!
//! State machine: `pending → processing` (claim) and `{pending, processing} → done`
//! (completion). A job never returns to `pending`. A job claimed by a worker that
//! dies before completing stays `processing`; there is no lease or requeue.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::jobs::error::JobError;
use crate::jobs::store::{Completion, JobStore};
use crate::jobs::types::{ClaimedJob, Document, Job, JobSummary};

pub const DEFAULT_FEED_LIMIT: i64 = 50;
pub const MAX_FEED_LIMIT: i64 = 200;

#[derive(Clone)]
pub struct JobService {
    store: Arc<dyn JobStore>,
}

impl JobService {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Records a new `pending` job and returns it. Either the whole row exists
    /// afterwards or nothing does.
    pub async fn create(&self, payload: Document) -> Result<Job, JobError> {
        let slug = new_slug();
        let job = self.store.insert(&slug, payload).await?;
        info!("Created export job {}", job.slug);
        Ok(job)
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Job, JobError> {
        self.store
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| JobError::NotFound(slug.to_string()))
    }

    /// Hands the oldest pending job to exactly one caller. `None` is the normal idle
    /// answer, not an error.
    pub async fn claim_next(&self) -> Result<Option<ClaimedJob>, JobError> {
        let claimed = self.store.claim_oldest_pending().await?;
        if let Some(ref job) = claimed {
            info!("Claimed export job {}", job.slug);
        }
        Ok(claimed.map(ClaimedJob::from))
    }

    /// Accepted from `pending` or `processing`; a `done` job keeps its first result.
    pub async fn mark_done(
        &self,
        slug: &str,
        result: Document,
        artifact_ref: Option<String>,
    ) -> Result<Job, JobError> {
        match self.store.complete(slug, result, artifact_ref).await? {
            Completion::Completed(job) => {
                info!(
                    "Export job {} done (artifact: {})",
                    job.slug,
                    job.artifact_ref.as_deref().unwrap_or("-")
                );
                Ok(job)
            }
            Completion::AlreadyDone => {
                warn!("Rejected completion of export job {slug}: already done");
                Err(JobError::AlreadyDone(slug.to_string()))
            }
            Completion::Missing => Err(JobError::NotFound(slug.to_string())),
        }
    }

    /// Recent jobs, newest first. `limit` defaults to 50 and is clamped to 1..=200.
    pub async fn list_recent(&self, limit: Option<i64>) -> Result<Vec<JobSummary>, JobError> {
        let limit = limit
            .unwrap_or(DEFAULT_FEED_LIMIT)
            .clamp(1, MAX_FEED_LIMIT);
        self.store.list_recent(limit).await
    }
}

/// 122 random bits as 32 lowercase hex characters.
pub fn new_slug() -> String {
    Uuid::new_v4().simple().to_string()
}
