//! Worker poll loop.
//!
//! One worker is one sequential loop: claim, render, report, repeat. An empty queue or
//! a failed iteration is followed by a fixed sleep; nothing short of the shutdown
//! signal ends the loop. A job claimed here and never reported (crash, kill) stays
//! `processing` on the server.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::client::JobApi;
use crate::error::WorkerError;
use crate::render::ExportRenderer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    Completed(String),
}

pub struct Poller {
    api: Arc<dyn JobApi>,
    renderer: Arc<dyn ExportRenderer>,
    poll_interval: Duration,
}

impl Poller {
    pub fn new(
        api: Arc<dyn JobApi>,
        renderer: Arc<dyn ExportRenderer>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            api,
            renderer,
            poll_interval,
        }
    }

    /// One iteration: claim at most one job, render it, report it.
    pub async fn tick(&self) -> Result<TickOutcome, WorkerError> {
        let Some(job) = self.api.claim_next().await? else {
            return Ok(TickOutcome::Idle);
        };
        info!("Claimed job {}", job.slug);

        let rendered = self.renderer.render(&job).await?;
        info!("Rendered job {} to {}", job.slug, rendered.artifact_ref);

        self.api
            .mark_done(&job.slug, &rendered.result, &rendered.artifact_ref)
            .await?;
        info!("Marked job {} done", job.slug);

        Ok(TickOutcome::Completed(job.slug))
    }

    /// Polls until `shutdown` resolves. Shutdown is observed between iterations and
    /// during sleeps, never in the middle of a job.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let pause = match self.tick().await {
                Ok(TickOutcome::Completed(slug)) => {
                    debug!("Finished job {slug}, polling again");
                    None
                }
                Ok(TickOutcome::Idle) => Some(self.poll_interval),
                Err(e) => {
                    error!("Worker iteration failed: {e}");
                    Some(self.poll_interval)
                }
            };

            let sleep = async {
                if let Some(delay) = pause {
                    tokio::time::sleep(delay).await;
                }
            };

            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = sleep => {}
            }
        }

        info!("Worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::*;
    use crate::client::ClaimedJob;
    use crate::render::{MockPdfRenderer, RenderedExport};

    const POLL: Duration = Duration::from_millis(100);

    /// Scripted claim answers; an exhausted script means an empty queue.
    #[derive(Default)]
    struct FakeApi {
        script: Mutex<VecDeque<Result<Option<ClaimedJob>, WorkerError>>>,
        claims: AtomicUsize,
        done: Mutex<Vec<(String, Value, String)>>,
    }

    impl FakeApi {
        fn with_script(script: Vec<Result<Option<ClaimedJob>, WorkerError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into_iter().collect()),
                ..Default::default()
            })
        }

        fn completed_slugs(&self) -> Vec<String> {
            self.done
                .lock()
                .unwrap()
                .iter()
                .map(|(slug, _, _)| slug.clone())
                .collect()
        }
    }

    #[async_trait]
    impl JobApi for FakeApi {
        async fn claim_next(&self) -> Result<Option<ClaimedJob>, WorkerError> {
            self.claims.fetch_add(1, Ordering::SeqCst);
            self.script.lock().unwrap().pop_front().unwrap_or(Ok(None))
        }

        async fn mark_done(
            &self,
            slug: &str,
            result: &Value,
            artifact_ref: &str,
        ) -> Result<(), WorkerError> {
            self.done.lock().unwrap().push((
                slug.to_string(),
                result.clone(),
                artifact_ref.to_string(),
            ));
            Ok(())
        }
    }

    struct FailingRenderer;

    #[async_trait]
    impl ExportRenderer for FailingRenderer {
        async fn render(&self, job: &ClaimedJob) -> Result<RenderedExport, WorkerError> {
            Err(WorkerError::Render {
                slug: job.slug.clone(),
                message: "boom".to_string(),
            })
        }
    }

    fn job(slug: &str) -> ClaimedJob {
        ClaimedJob {
            slug: slug.to_string(),
            payload: json!({"resume": {"name": slug}}),
        }
    }

    fn api_down() -> WorkerError {
        WorkerError::Api {
            status: 500,
            message: "down".to_string(),
        }
    }

    #[tokio::test]
    async fn test_tick_idle_when_queue_empty() {
        let api = FakeApi::with_script(vec![]);
        let dir = tempfile::tempdir().unwrap();
        let renderer = Arc::new(MockPdfRenderer::new(dir.path()).await.unwrap());
        let poller = Poller::new(api.clone(), renderer, POLL);

        assert_eq!(poller.tick().await.unwrap(), TickOutcome::Idle);
        assert!(api.completed_slugs().is_empty());
    }

    #[tokio::test]
    async fn test_tick_renders_and_reports_completion() {
        let api = FakeApi::with_script(vec![Ok(Some(job("j1")))]);
        let dir = tempfile::tempdir().unwrap();
        let renderer = Arc::new(MockPdfRenderer::new(dir.path()).await.unwrap());
        let poller = Poller::new(api.clone(), renderer, POLL);

        assert_eq!(
            poller.tick().await.unwrap(),
            TickOutcome::Completed("j1".to_string())
        );

        let done = api.done.lock().unwrap().clone();
        assert_eq!(done.len(), 1);
        let (slug, result, artifact_ref) = &done[0];
        assert_eq!(slug, "j1");
        assert_eq!(result, &json!({"message": "mock_pdf_created"}));
        assert!(artifact_ref.ends_with("j1.pdf"));
        assert!(std::path::Path::new(artifact_ref).exists());
    }

    #[tokio::test]
    async fn test_render_failure_is_not_reported_as_done() {
        let api = FakeApi::with_script(vec![Ok(Some(job("j1")))]);
        let poller = Poller::new(api.clone(), Arc::new(FailingRenderer), POLL);

        assert!(matches!(
            poller.tick().await,
            Err(WorkerError::Render { .. })
        ));
        assert!(api.completed_slugs().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_survives_failures_and_backs_off() {
        // t=0 claim fails, sleep to t=100
        // t=100 j1 completes, poll again at once
        // t=100 render of j2 fails, sleep to t=200
        // t=200 empty, sleep to t=300; shutdown fires at t=250
        let api = FakeApi::with_script(vec![
            Err(api_down()),
            Ok(Some(job("j1"))),
            Ok(Some(job("j2"))),
        ]);
        let renderer = Arc::new(StubRenderer { fail_slug: Some("j2") });
        let poller = Poller::new(api.clone(), renderer, POLL);

        let started = tokio::time::Instant::now();
        poller
            .run(tokio::time::sleep(Duration::from_millis(250)))
            .await;

        assert_eq!(api.claims.load(Ordering::SeqCst), 4);
        assert_eq!(api.completed_slugs(), vec!["j1".to_string()]);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(250) && elapsed < Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_sleeps_between_empty_polls() {
        let api = FakeApi::with_script(vec![]);
        let poller = Poller::new(api.clone(), Arc::new(StubRenderer { fail_slug: None }), POLL);

        poller
            .run(tokio::time::sleep(Duration::from_millis(350)))
            .await;

        // Polls at t=0, 100, 200, 300.
        assert_eq!(api.claims.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_run_stops_on_ready_shutdown_after_one_iteration() {
        let api = FakeApi::with_script(vec![Ok(Some(job("j1"))), Ok(Some(job("j2")))]);
        let dir = tempfile::tempdir().unwrap();
        let renderer = Arc::new(MockPdfRenderer::new(dir.path()).await.unwrap());
        let poller = Poller::new(api.clone(), renderer, POLL);

        poller.run(std::future::ready(())).await;

        assert_eq!(api.completed_slugs(), vec!["j1".to_string()]);
    }

    /// Renders without touching the filesystem; fails for one chosen slug.
    struct StubRenderer {
        fail_slug: Option<&'static str>,
    }

    #[async_trait]
    impl ExportRenderer for StubRenderer {
        async fn render(&self, job: &ClaimedJob) -> Result<RenderedExport, WorkerError> {
            if Some(job.slug.as_str()) == self.fail_slug {
                return FailingRenderer.render(job).await;
            }
            Ok(RenderedExport {
                result: json!({"message": "stub"}),
                artifact_ref: format!("/exports/{}.pdf", job.slug),
            })
        }
    }
}
