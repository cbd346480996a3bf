//! Render worker queue.
//!
//! Jobs are submitted to a bounded channel drained by a fixed pool of
//! workers. Each job runs the blocking pipeline on the blocking thread pool
//! and reports back through its own completion signal. There is no
//! cancellation once a job has been picked up.

use std::sync::Arc;

use promoreel_common::error::{ReelError, ReelResult};
use promoreel_job_model::{JobId, RenderJob};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::pipeline::ReelPipeline;

/// Pending submissions buffered per worker.
const QUEUE_DEPTH_PER_WORKER: usize = 16;

struct QueuedJob {
    job: RenderJob,
    done: oneshot::Sender<ReelResult<RenderJob>>,
}

/// Completion signal for one submitted job.
#[derive(Debug)]
pub struct JobHandle {
    pub job_id: JobId,
    receiver: oneshot::Receiver<ReelResult<RenderJob>>,
}

impl JobHandle {
    /// Wait for the job to reach a terminal status and return its record.
    pub async fn wait(self) -> ReelResult<RenderJob> {
        self.receiver
            .await
            .map_err(|_| ReelError::job(format!("Render worker dropped job {}", self.job_id)))?
    }
}

/// Pool of render workers.
pub struct RenderQueue {
    sender: Option<mpsc::Sender<QueuedJob>>,
    workers: Vec<JoinHandle<()>>,
    pipeline: Arc<ReelPipeline>,
}

impl RenderQueue {
    /// Spawn `workers` workers on the current runtime.
    pub fn start(pipeline: Arc<ReelPipeline>, workers: usize) -> Self {
        let workers = workers.max(1);
        let (sender, receiver) = mpsc::channel::<QueuedJob>(workers * QUEUE_DEPTH_PER_WORKER);
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..workers)
            .map(|worker_id| {
                let receiver = Arc::clone(&receiver);
                let pipeline = Arc::clone(&pipeline);
                tokio::spawn(worker_loop(worker_id, receiver, pipeline))
            })
            .collect();

        tracing::info!(workers, "Render queue started");
        Self {
            sender: Some(sender),
            workers: handles,
            pipeline,
        }
    }

    /// Store the pending job and queue it for rendering.
    pub async fn submit(&self, job: RenderJob) -> ReelResult<JobHandle> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| ReelError::job("Render queue is shut down"))?;

        self.pipeline.jobs().save(&job)?;
        let job_id = job.id.clone();
        let (done, receiver) = oneshot::channel();
        sender
            .send(QueuedJob { job, done })
            .await
            .map_err(|_| ReelError::job("Render queue is shut down"))?;

        tracing::debug!(job_id = %job_id, "Job queued");
        Ok(JobHandle { job_id, receiver })
    }

    /// Stop accepting jobs and wait for queued ones to finish.
    pub async fn shutdown(mut self) {
        self.sender.take();
        for handle in self.workers.drain(..) {
            if let Err(err) = handle.await {
                tracing::error!(error = %err, "Render worker terminated abnormally");
            }
        }
        tracing::info!("Render queue stopped");
    }
}

async fn worker_loop(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<QueuedJob>>>,
    pipeline: Arc<ReelPipeline>,
) {
    loop {
        let next = receiver.lock().await.recv().await;
        let Some(QueuedJob { job, done }) = next else {
            break;
        };

        let job_id = job.id.clone();
        tracing::debug!(worker_id, job_id = %job_id, "Worker picked up job");

        let pipeline = Arc::clone(&pipeline);
        let result = tokio::task::spawn_blocking(move || {
            let mut job = job;
            pipeline.process(&mut job, None).map(|_| job)
        })
        .await
        .unwrap_or_else(|err| {
            Err(ReelError::job(format!(
                "Render worker panicked on job {job_id}: {err}"
            )))
        });

        if done.send(result).is_err() {
            tracing::debug!(worker_id, "Submitter stopped waiting for job");
        }
    }
    tracing::debug!(worker_id, "Render worker exiting");
}
