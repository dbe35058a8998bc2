use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::jobs::error::JobError;

/// Opaque structured document carried by a job. The queue never looks inside it.
pub type Document = serde_json::Value;

/// Export job lifecycle. Only ever moves forward: pending → processing → done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Done,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "done" => Ok(JobStatus::Done),
            other => Err(JobError::Corrupt(format!("unknown job status '{other}'"))),
        }
    }
}

/// A full export job record.
///
/// `id` is the storage surrogate key and is never serialized; callers address
/// jobs by `slug` only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    #[serde(skip)]
    pub id: i64,
    pub slug: String,
    pub status: JobStatus,
    pub payload: Document,
    pub result: Option<Document>,
    pub artifact_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a worker receives from a successful claim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimedJob {
    pub slug: String,
    pub payload: Document,
}

impl From<Job> for ClaimedJob {
    fn from(job: Job) -> Self {
        Self {
            slug: job.slug,
            payload: job.payload,
        }
    }
}

/// Row of the recent-jobs feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSummary {
    pub slug: String,
    pub status: JobStatus,
    pub artifact_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self {
            slug: job.slug.clone(),
            status: job.status,
            artifact_ref: job.artifact_ref.clone(),
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}
