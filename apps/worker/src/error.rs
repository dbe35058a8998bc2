use thiserror::Error;

/// Anything that can go wrong in one poll iteration. None of these stop the loop.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("API returned an unusable job slug: {0:?}")]
    InvalidSlug(String),

    #[error("Render failed for job {slug}: {message}")]
    Render { slug: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
