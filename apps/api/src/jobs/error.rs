use thiserror::Error;

/// Errors surfaced by the job store and job service.
///
/// The service never retries; every variant goes straight back to the caller.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("export job {0} not found")]
    NotFound(String),

    #[error("export job {0} is already done")]
    AlreadyDone(String),

    #[error("duplicate export job slug {0}")]
    DuplicateSlug(String),

    #[error("job store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("corrupt job record: {0}")]
    Corrupt(String),
}

/// Coarse classification used at the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Infrastructure,
}

impl JobError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            JobError::NotFound(_) => ErrorKind::NotFound,
            JobError::AlreadyDone(_) => ErrorKind::Conflict,
            JobError::DuplicateSlug(_) | JobError::Store(_) | JobError::Corrupt(_) => {
                ErrorKind::Infrastructure
            }
        }
    }
}
