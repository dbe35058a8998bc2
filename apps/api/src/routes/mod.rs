pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::jobs::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/healthz", get(health::healthz_handler))
        // Export jobs: producer side
        .route("/api/v1/exports", post(handlers::handle_create_export))
        .route("/api/v1/exports/:slug", get(handlers::handle_get_export))
        // Export jobs: worker side. `next` is a static segment, never a slug.
        .route("/api/v1/exports/next", post(handlers::handle_claim_next))
        .route(
            "/api/v1/exports/:slug/done",
            post(handlers::handle_mark_done),
        )
        // Recent jobs feed
        .route("/api/v1/jobs", get(handlers::handle_jobs_feed))
        .with_state(state)
}
