// Export job queue: producers enqueue work through the API, worker processes claim
// one job at a time and report completion. All coordination goes through the store.

pub mod error;
pub mod handlers;
pub mod pg_store;
pub mod service;
pub mod store;
pub mod types;

pub use error::{ErrorKind, JobError};
pub use pg_store::PgJobStore;
pub use service::JobService;
pub use store::{JobStore, MemoryJobStore};
