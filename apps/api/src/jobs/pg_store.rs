//! PostgreSQL job store.
//!
//! Claims rely on `FOR UPDATE SKIP LOCKED`: the select and the status flip happen in a
//! single statement, and a row locked by one claimer is invisible to the others, so
//! any number of API processes can serve workers from the same table.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use crate::jobs::error::JobError;
use crate::jobs::store::{Completion, JobStore};
use crate::jobs::types::{Document, Job, JobSummary};
use crate::models::job::{ExportJobRow, ExportJobSummaryRow};

#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn insert(&self, slug: &str, payload: Document) -> Result<Job, JobError> {
        let row = sqlx::query_as::<_, ExportJobRow>(
            r#"
            INSERT INTO export_jobs (slug, status, payload)
            VALUES ($1, 'pending', $2)
            RETURNING id, slug, status, payload, result, artifact_ref, created_at, updated_at
            "#,
        )
        .bind(slug)
        .bind(&payload)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                JobError::DuplicateSlug(slug.to_string())
            }
            other => JobError::Store(other),
        })?;

        Job::try_from(row)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Job>, JobError> {
        sqlx::query_as::<_, ExportJobRow>(
            r#"
            SELECT id, slug, status, payload, result, artifact_ref, created_at, updated_at
            FROM export_jobs
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?
        .map(Job::try_from)
        .transpose()
    }

    async fn claim_oldest_pending(&self) -> Result<Option<Job>, JobError> {
        let row = sqlx::query_as::<_, ExportJobRow>(
            r#"
            UPDATE export_jobs
            SET status = 'processing', updated_at = now()
            WHERE id = (
                SELECT id
                FROM export_jobs
                WHERE status = 'pending'
                ORDER BY created_at, id
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, slug, status, payload, result, artifact_ref, created_at, updated_at
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        if let Some(ref row) = row {
            debug!("Claimed export job row {} ({})", row.id, row.slug);
        }
        row.map(Job::try_from).transpose()
    }

    async fn complete(
        &self,
        slug: &str,
        result: Document,
        artifact_ref: Option<String>,
    ) -> Result<Completion, JobError> {
        let row = sqlx::query_as::<_, ExportJobRow>(
            r#"
            UPDATE export_jobs
            SET status = 'done', result = $2, artifact_ref = $3, updated_at = now()
            WHERE slug = $1 AND status <> 'done'
            RETURNING id, slug, status, payload, result, artifact_ref, created_at, updated_at
            "#,
        )
        .bind(slug)
        .bind(&result)
        .bind(artifact_ref.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Completion::Completed(Job::try_from(row)?)),
            None => match self.find_by_slug(slug).await? {
                Some(_) => Ok(Completion::AlreadyDone),
                None => Ok(Completion::Missing),
            },
        }
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<JobSummary>, JobError> {
        sqlx::query_as::<_, ExportJobSummaryRow>(
            r#"
            SELECT slug, status, artifact_ref, created_at, updated_at
            FROM export_jobs
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(JobSummary::try_from)
        .collect()
    }
}

/// These run against a real database: `TEST_DATABASE_URL=postgres://... cargo test -- --ignored`.
/// They share one table, so every scenario lives in a single test.
#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::db::{create_pool, run_migrations};
    use crate::jobs::types::JobStatus;
    use serde_json::json;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_pg_store_lifecycle_and_concurrent_claims() {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL not set");
        let pool = create_pool(&url, 10).await.unwrap();
        run_migrations(&pool).await.unwrap();
        sqlx::query("TRUNCATE export_jobs").execute(&pool).await.unwrap();
        let store = PgJobStore::new(pool);

        // Lifecycle
        let job = store.insert("pg-a", json!({"resume": {"name": "A"}})).await.unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert!(matches!(
            store.insert("pg-a", json!({})).await,
            Err(JobError::DuplicateSlug(_))
        ));

        let claimed = store.claim_oldest_pending().await.unwrap().unwrap();
        assert_eq!(claimed.slug, "pg-a");
        assert_eq!(claimed.status, JobStatus::Processing);
        assert!(store.claim_oldest_pending().await.unwrap().is_none());

        let done = store
            .complete("pg-a", json!({"message": "ok"}), Some("/exports/x.pdf".into()))
            .await
            .unwrap();
        assert!(matches!(done, Completion::Completed(ref j) if j.status == JobStatus::Done));
        assert_eq!(
            store.complete("pg-a", json!({}), None).await.unwrap(),
            Completion::AlreadyDone
        );
        assert_eq!(
            store.complete("pg-missing", json!({}), None).await.unwrap(),
            Completion::Missing
        );

        // Concurrent claims: N pending jobs, N claimers, N distinct winners.
        const N: usize = 16;
        for i in 0..N {
            store.insert(&format!("pg-c{i}"), json!({"i": i})).await.unwrap();
        }
        let mut handles = Vec::new();
        for _ in 0..N {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.claim_oldest_pending().await.unwrap()
            }));
        }
        let mut slugs = HashSet::new();
        for handle in handles {
            let job = handle.await.unwrap().expect("every claimer gets a job");
            assert!(slugs.insert(job.slug));
        }
        assert_eq!(slugs.len(), N);
        assert!(store.claim_oldest_pending().await.unwrap().is_none());

        let recent = store.list_recent(200).await.unwrap();
        assert_eq!(recent.len(), N + 1);
        assert!(recent.iter().all(|s| s.status != JobStatus::Pending));
    }
}
