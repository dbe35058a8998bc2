use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;

use crate::jobs::error::JobError;
use crate::jobs::types::{Job, JobSummary};

#[derive(Debug, Clone, FromRow)]
pub struct ExportJobRow {
    pub id: i64,
    pub slug: String,
    pub status: String,
    pub payload: Value,
    pub result: Option<Value>,
    pub artifact_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ExportJobSummaryRow {
    pub slug: String,
    pub status: String,
    pub artifact_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ExportJobRow> for Job {
    type Error = JobError;

    fn try_from(row: ExportJobRow) -> Result<Self, Self::Error> {
        Ok(Job {
            id: row.id,
            status: row.status.parse()?,
            slug: row.slug,
            payload: row.payload,
            result: row.result,
            artifact_ref: row.artifact_ref,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<ExportJobSummaryRow> for JobSummary {
    type Error = JobError;

    fn try_from(row: ExportJobSummaryRow) -> Result<Self, Self::Error> {
        Ok(JobSummary {
            status: row.status.parse()?,
            slug: row.slug,
            artifact_ref: row.artifact_ref,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
