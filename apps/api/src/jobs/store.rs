//! Job Store: the durable table of export jobs and the single source of truth
//! for their status.
//!
//! `PgJobStore` (see `pg_store`) is the production backend. `MemoryJobStore` keeps
//! everything in process and is meant for local development and tests.
//!
//! `AppState` carries the store as `Arc<dyn JobStore>` behind `JobService`; nothing
//! else may mutate job status.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::jobs::error::JobError;
use crate::jobs::types::{Document, Job, JobStatus, JobSummary};

/// Outcome of a completion attempt at the store level.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Completed(Job),
    AlreadyDone,
    Missing,
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Inserts a new `pending` job. Timestamps are set by the store.
    async fn insert(&self, slug: &str, payload: Document) -> Result<Job, JobError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Job>, JobError>;

    /// Selects the oldest pending job (by `created_at`, then `id`) and flips it to
    /// `processing` in one critical section. Concurrent callers never receive the
    /// same job.
    async fn claim_oldest_pending(&self) -> Result<Option<Job>, JobError>;

    /// Sets status `done` and records the result and artifact reference, unless the
    /// job is already done.
    async fn complete(
        &self,
        slug: &str,
        result: Document,
        artifact_ref: Option<String>,
    ) -> Result<Completion, JobError>;

    /// Newest first.
    async fn list_recent(&self, limit: i64) -> Result<Vec<JobSummary>, JobError>;
}

// ────────────────────────────────────────────────────────────────────────────
// MemoryJobStore
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    /// Insertion order, which is also `id` order.
    jobs: Vec<Job>,
}

impl MemoryState {
    fn position(&self, slug: &str) -> Option<usize> {
        self.jobs.iter().position(|j| j.slug == slug)
    }
}

/// In-process job store. The mutex is the critical section for claims, so it only
/// coordinates workers that share this process (i.e. tests and local runs).
#[derive(Debug, Default, Clone)]
pub struct MemoryJobStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert(&self, slug: &str, payload: Document) -> Result<Job, JobError> {
        let mut state = self.state.lock().await;
        if state.position(slug).is_some() {
            return Err(JobError::DuplicateSlug(slug.to_string()));
        }

        state.next_id += 1;
        let now = Utc::now();
        let job = Job {
            id: state.next_id,
            slug: slug.to_string(),
            status: JobStatus::Pending,
            payload,
            result: None,
            artifact_ref: None,
            created_at: now,
            updated_at: now,
        };
        state.jobs.push(job.clone());
        Ok(job)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Job>, JobError> {
        let state = self.state.lock().await;
        Ok(state.position(slug).map(|i| state.jobs[i].clone()))
    }

    async fn claim_oldest_pending(&self) -> Result<Option<Job>, JobError> {
        let mut state = self.state.lock().await;
        let oldest = state
            .jobs
            .iter_mut()
            .filter(|j| j.status == JobStatus::Pending)
            .min_by_key(|j| (j.created_at, j.id));

        Ok(oldest.map(|job| {
            job.status = JobStatus::Processing;
            job.updated_at = Utc::now();
            job.clone()
        }))
    }

    async fn complete(
        &self,
        slug: &str,
        result: Document,
        artifact_ref: Option<String>,
    ) -> Result<Completion, JobError> {
        let mut state = self.state.lock().await;
        let Some(i) = state.position(slug) else {
            return Ok(Completion::Missing);
        };

        let job = &mut state.jobs[i];
        if job.status.is_terminal() {
            return Ok(Completion::AlreadyDone);
        }
        job.status = JobStatus::Done;
        job.result = Some(result);
        job.artifact_ref = artifact_ref;
        job.updated_at = Utc::now();
        Ok(Completion::Completed(job.clone()))
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<JobSummary>, JobError> {
        let state = self.state.lock().await;
        let mut jobs: Vec<&Job> = state.jobs.iter().collect();
        jobs.sort_by_key(|j| std::cmp::Reverse((j.created_at, j.id)));
        Ok(jobs
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(0))
            .map(JobSummary::from)
            .collect())
    }
}
