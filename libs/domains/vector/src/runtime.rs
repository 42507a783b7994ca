//! Worker pool for vector jobs.
//!
//! The runtime owns the live knobs (pause flag, worker count) and the
//! claim/run loop. Embedding itself is delegated to a [`JobProcessor`].

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::VectorError;
use crate::jobs::VectorJobRepository;
use crate::models::{EmbeddingOutcome, RuntimeStats, VectorJob};

/// Computes and stores the embedding of one file
#[async_trait]
pub trait JobProcessor: Send + Sync {
    async fn process(&self, job: &VectorJob) -> Result<EmbeddingOutcome, VectorError>;

    /// Processor name for logging
    fn name(&self) -> &'static str;
}

/// Live state of the queue: pause flag, concurrency limit, active workers
pub struct QueueRuntime {
    paused: watch::Sender<bool>,
    permits: Arc<Semaphore>,
    max_workers: AtomicUsize,
    active: Arc<AtomicUsize>,
    // Serializes pause/concurrency changes
    knobs: Mutex<()>,
    poll_interval: Duration,
}

impl QueueRuntime {
    pub fn new(max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        let (paused, _) = watch::channel(false);
        Self {
            paused,
            permits: Arc::new(Semaphore::new(max_workers)),
            max_workers: AtomicUsize::new(max_workers),
            active: Arc::new(AtomicUsize::new(0)),
            knobs: Mutex::new(()),
            poll_interval: Duration::from_secs(2),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    pub async fn set_paused(&self, paused: bool) {
        let _guard = self.knobs.lock().await;
        self.paused.send_replace(paused);
        info!(paused, "Vector queue pause flag changed");
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers.load(Ordering::SeqCst)
    }

    pub fn active_workers(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Change the worker limit without interrupting running jobs.
    ///
    /// Growing adds permits at once; shrinking retires permits as running
    /// jobs release them.
    pub async fn set_concurrency(&self, workers: usize) {
        let _guard = self.knobs.lock().await;
        let workers = workers.max(1);
        let current = self.max_workers.swap(workers, Ordering::SeqCst);

        if workers > current {
            self.permits.add_permits(workers - current);
        } else if workers < current {
            let surplus = (current - workers) as u32;
            let permits = Arc::clone(&self.permits);
            tokio::spawn(async move {
                if let Ok(retired) = permits.acquire_many_owned(surplus).await {
                    retired.forget();
                }
            });
        }

        info!(from = current, to = workers, "Vector queue concurrency changed");
    }

    pub fn stats(&self) -> RuntimeStats {
        RuntimeStats {
            paused: self.is_paused(),
            active_workers: self.active_workers(),
            max_workers: self.max_workers(),
            available_permits: self.permits.available_permits(),
        }
    }

    /// Claim and process jobs until `shutdown` flips to true.
    ///
    /// Running jobs are awaited before returning.
    pub async fn run<P>(
        self: Arc<Self>,
        jobs: Arc<dyn VectorJobRepository>,
        processor: Arc<P>,
        mut shutdown: watch::Receiver<bool>,
    ) where
        P: JobProcessor + 'static,
    {
        info!(
            processor = processor.name(),
            max_workers = self.max_workers(),
            "Starting vector queue runtime"
        );

        let mut paused = self.paused.subscribe();
        let mut workers: JoinSet<()> = JoinSet::new();

        loop {
            if *shutdown.borrow() {
                break;
            }

            // Reap finished workers so the set does not grow unbounded
            while workers.try_join_next().is_some() {}

            if *paused.borrow_and_update() {
                tokio::select! {
                    _ = paused.changed() => continue,
                    changed = shutdown.changed() => if changed.is_err() { break } else { continue },
                }
            }

            let permit = tokio::select! {
                permit = Arc::clone(&self.permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                changed = shutdown.changed() => if changed.is_err() { break } else { continue },
            };

            match jobs.claim_next().await {
                Ok(Some(job)) => {
                    let jobs = Arc::clone(&jobs);
                    let processor = Arc::clone(&processor);
                    let active = Arc::clone(&self.active);
                    active.fetch_add(1, Ordering::SeqCst);

                    workers.spawn(async move {
                        let _permit = permit;
                        run_job(jobs.as_ref(), processor.as_ref(), &job).await;
                        active.fetch_sub(1, Ordering::SeqCst);
                    });
                }
                Ok(None) => {
                    drop(permit);
                    tokio::select! {
                        _ = tokio::time::sleep(self.poll_interval) => {}
                        changed = shutdown.changed() => if changed.is_err() { break },
                    }
                }
                Err(e) => {
                    drop(permit);
                    warn!(error = %e, "Failed to claim vector job");
                    tokio::select! {
                        _ = tokio::time::sleep(self.poll_interval) => {}
                        changed = shutdown.changed() => if changed.is_err() { break },
                    }
                }
            }
        }

        info!(in_flight = workers.len(), "Stopping vector queue runtime");
        while workers.join_next().await.is_some() {}
        info!("Vector queue runtime stopped");
    }
}

async fn run_job<P: JobProcessor + ?Sized>(jobs: &dyn VectorJobRepository, processor: &P, job: &VectorJob) {
    let started = Instant::now();
    debug!(file_id = job.file_id, "Processing vector job");

    let result = processor.process(job).await;
    let elapsed_ms = started.elapsed().as_millis() as i64;

    let recorded = match result {
        Ok(outcome) => jobs.complete(job.file_id, outcome, elapsed_ms).await,
        Err(e) => {
            warn!(file_id = job.file_id, error = %e, "Vector job failed");
            jobs.fail(job.file_id, e.to_string(), elapsed_ms).await
        }
    };

    if let Err(e) = recorded {
        error!(file_id = job.file_id, error = %e, "Failed to record vector job result");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::MockVectorJobRepository;
    use crate::models::JobStatus;
    use chrono::Utc;

    struct FixedProcessor;

    #[async_trait]
    impl JobProcessor for FixedProcessor {
        async fn process(&self, _job: &VectorJob) -> Result<EmbeddingOutcome, VectorError> {
            Ok(EmbeddingOutcome {
                model: "text-embedding-3-small".to_string(),
                dimension: 1536,
            })
        }

        fn name(&self) -> &'static str {
            "FixedProcessor"
        }
    }

    fn job(file_id: i32) -> VectorJob {
        VectorJob {
            id: file_id,
            file_id,
            status: JobStatus::Running,
            model: String::new(),
            dimension: 0,
            retry_count: 0,
            last_retry_at: None,
            error_message: None,
            processing_duration: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_pause_flag() {
        let runtime = QueueRuntime::new(2);
        assert!(!runtime.is_paused());
        runtime.set_paused(true).await;
        assert!(runtime.stats().paused);
    }

    #[tokio::test]
    async fn test_concurrency_grows_and_shrinks() {
        let runtime = QueueRuntime::new(2);

        runtime.set_concurrency(5).await;
        assert_eq!(runtime.max_workers(), 5);
        assert_eq!(runtime.stats().available_permits, 5);

        runtime.set_concurrency(1).await;
        assert_eq!(runtime.max_workers(), 1);
        // The retiring task runs on the next scheduler turn
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(runtime.stats().available_permits, 1);
    }

    #[tokio::test]
    async fn test_zero_concurrency_clamps_to_one() {
        let runtime = QueueRuntime::new(0);
        assert_eq!(runtime.max_workers(), 1);
    }

    #[tokio::test]
    async fn test_run_processes_claimed_job_and_stops() {
        let mut jobs = MockVectorJobRepository::new();
        let mut handed_out = false;
        jobs.expect_claim_next().returning(move || {
            if handed_out {
                Ok(None)
            } else {
                handed_out = true;
                Ok(Some(job(7)))
            }
        });
        jobs.expect_complete()
            .withf(|file_id, outcome, _| *file_id == 7 && outcome.dimension == 1536)
            .times(1)
            .returning(|_, _, _| Ok(()));

        let runtime = Arc::new(QueueRuntime::new(2).with_poll_interval(Duration::from_millis(5)));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(Arc::clone(&runtime).run(
            Arc::new(jobs),
            Arc::new(FixedProcessor),
            shutdown_rx,
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(runtime.active_workers(), 0);
    }

    #[tokio::test]
    async fn test_paused_runtime_claims_nothing() {
        let mut jobs = MockVectorJobRepository::new();
        jobs.expect_claim_next().times(0);

        let runtime = Arc::new(QueueRuntime::new(1).with_poll_interval(Duration::from_millis(5)));
        runtime.set_paused(true).await;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(Arc::clone(&runtime).run(
            Arc::new(jobs),
            Arc::new(FixedProcessor),
            shutdown_rx,
        ));

        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
