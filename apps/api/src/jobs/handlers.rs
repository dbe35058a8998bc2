//! Axum route handlers for the export job API.
//!
//! Producers create jobs and poll them by slug; workers claim and complete them.
//! These handlers only translate between HTTP and `JobService`.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::errors::AppError;
use crate::jobs::types::{ClaimedJob, Document, Job, JobStatus, JobSummary};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CreateExportResponse {
    pub slug: String,
    pub status: JobStatus,
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub job: Job,
}

/// `job` is `null` when nothing is pending.
#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub job: Option<ClaimedJob>,
}

#[derive(Debug, Deserialize)]
pub struct MarkDoneRequest {
    #[serde(default = "empty_document")]
    pub result: Document,
    #[serde(default, alias = "file_path")]
    pub artifact_ref: Option<String>,
}

fn empty_document() -> Document {
    json!({})
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct JobsFeedResponse {
    pub jobs: Vec<JobSummary>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/exports
///
/// The body is stored verbatim as the job payload. An empty body becomes `{}`.
pub async fn handle_create_export(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<CreateExportResponse>), AppError> {
    let payload: Document = if body.iter().all(u8::is_ascii_whitespace) {
        empty_document()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::Validation(format!("payload must be valid JSON: {e}")))?
    };

    let job = state.jobs.create(payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateExportResponse {
            slug: job.slug,
            status: job.status,
        }),
    ))
}

/// POST /api/v1/exports/next
pub async fn handle_claim_next(
    State(state): State<AppState>,
) -> Result<Json<ClaimResponse>, AppError> {
    let job = state.jobs.claim_next().await?;
    Ok(Json(ClaimResponse { job }))
}

/// GET /api/v1/exports/:slug
pub async fn handle_get_export(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<JobResponse>, AppError> {
    let job = state.jobs.get_by_slug(&slug).await?;
    Ok(Json(JobResponse { job }))
}

/// POST /api/v1/exports/:slug/done
pub async fn handle_mark_done(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(request): Json<MarkDoneRequest>,
) -> Result<Json<JobResponse>, AppError> {
    let job = state
        .jobs
        .mark_done(&slug, request.result, request.artifact_ref)
        .await?;
    Ok(Json(JobResponse { job }))
}

/// GET /api/v1/jobs?limit=N
pub async fn handle_jobs_feed(
    State(state): State<AppState>,
    Query(params): Query<FeedQuery>,
) -> Result<Json<JobsFeedResponse>, AppError> {
    let jobs = state.jobs.list_recent(params.limit).await?;
    Ok(Json(JobsFeedResponse { jobs }))
}
