//! HTTP client for the worker side of the export job API.
//!
//! The worker never touches the job store; claims and completions go through the
//! API so any number of worker processes can share one queue.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::WorkerError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClaimedJob {
    pub slug: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Deserialize)]
struct ClaimResponse {
    job: Option<ClaimedJob>,
}

#[derive(Debug, Serialize)]
struct MarkDoneRequest<'a> {
    result: &'a Value,
    artifact_ref: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// The two calls a worker makes against the job queue.
#[async_trait]
pub trait JobApi: Send + Sync {
    /// `None` when no job is pending.
    async fn claim_next(&self) -> Result<Option<ClaimedJob>, WorkerError>;

    async fn mark_done(
        &self,
        slug: &str,
        result: &Value,
        artifact_ref: &str,
    ) -> Result<(), WorkerError>;
}

#[derive(Clone)]
pub struct HttpJobApi {
    client: Client,
    base_url: String,
}

impl HttpJobApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, WorkerError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl JobApi for HttpJobApi {
    async fn claim_next(&self) -> Result<Option<ClaimedJob>, WorkerError> {
        let url = format!("{}/api/v1/exports/next", self.base_url);
        let response = ensure_success(self.client.post(&url).send().await?).await?;
        let body: ClaimResponse = response.json().await?;

        if let Some(ref job) = body.job {
            if !is_valid_slug(&job.slug) {
                return Err(WorkerError::InvalidSlug(job.slug.clone()));
            }
        }
        Ok(body.job)
    }

    async fn mark_done(
        &self,
        slug: &str,
        result: &Value,
        artifact_ref: &str,
    ) -> Result<(), WorkerError> {
        if !is_valid_slug(slug) {
            return Err(WorkerError::InvalidSlug(slug.to_string()));
        }
        let url = format!("{}/api/v1/exports/{slug}/done", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&MarkDoneRequest {
                result,
                artifact_ref,
            })
            .send()
            .await?;
        ensure_success(response).await?;
        debug!("Reported completion of job {slug}");
        Ok(())
    }
}

async fn ensure_success(response: Response) -> Result<Response, WorkerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    Err(WorkerError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Slugs end up in URLs and file names, so only plain identifier characters pass.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= 128
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
