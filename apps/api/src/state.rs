use crate::jobs::JobService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Export job queue. Backed by PostgreSQL or the in-memory store, per `JOB_STORE`.
    pub jobs: JobService,
}
