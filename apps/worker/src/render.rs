use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use crate::client::ClaimedJob;
use crate::error::WorkerError;

/// What a finished unit of work hands back to the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedExport {
    pub result: Value,
    pub artifact_ref: String,
}

/// The unit of work behind an export job. The poll loop treats it as opaque.
#[async_trait]
pub trait ExportRenderer: Send + Sync {
    async fn render(&self, job: &ClaimedJob) -> Result<RenderedExport, WorkerError>;
}

/// Writes `<exports_dir>/<slug>.pdf` holding a plain-text dump of the payload.
/// Stand-in until a real PDF renderer exists.
#[derive(Debug, Clone)]
pub struct MockPdfRenderer {
    exports_dir: PathBuf,
}

impl MockPdfRenderer {
    /// Creates the exports directory if it does not exist yet.
    pub async fn new(exports_dir: impl Into<PathBuf>) -> Result<Self, WorkerError> {
        let exports_dir = exports_dir.into();
        tokio::fs::create_dir_all(&exports_dir).await?;
        Ok(Self { exports_dir })
    }

    pub fn exports_dir(&self) -> &Path {
        &self.exports_dir
    }
}

#[async_trait]
impl ExportRenderer for MockPdfRenderer {
    async fn render(&self, job: &ClaimedJob) -> Result<RenderedExport, WorkerError> {
        let render_err = |message: String| WorkerError::Render {
            slug: job.slug.clone(),
            message,
        };

        let pretty = serde_json::to_string_pretty(&job.payload)
            .map_err(|e| render_err(e.to_string()))?;
        let content = [
            format!("Mock PDF for job {}", job.slug),
            format!("Generated at: {}", Utc::now().to_rfc3339()),
            String::new(),
            "Payload:".to_string(),
            pretty,
            String::new(),
            "--- End of mock PDF ---".to_string(),
        ]
        .join("\n");

        let path = self.exports_dir.join(format!("{}.pdf", job.slug));
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| render_err(format!("writing {}: {e}", path.display())))?;

        Ok(RenderedExport {
            result: json!({"message": "mock_pdf_created"}),
            artifact_ref: path.display().to_string(),
        })
    }
}
