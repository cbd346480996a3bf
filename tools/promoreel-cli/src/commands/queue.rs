//! Render every pending job on a worker pool.

use std::sync::Arc;

use promoreel_common::config::AppConfig;
use promoreel_job_model::{JobRepository, JobStatus};
use promoreel_render_engine::{ReelPipeline, RenderQueue};

pub async fn run(config: AppConfig, workers: usize) -> anyhow::Result<()> {
    let pipeline = Arc::new(
        ReelPipeline::from_config(config)
            .map_err(|e| anyhow::anyhow!("Failed to set up pipeline: {e}"))?,
    );

    let mut pending: Vec<_> = pipeline
        .jobs()
        .list()?
        .into_iter()
        .filter(|job| job.status == JobStatus::Pending)
        .collect();
    pending.sort_by_key(|job| job.created_at);

    if pending.is_empty() {
        println!("No pending jobs.");
        return Ok(());
    }
    println!("Rendering {} pending job(s) on {workers} worker(s)", pending.len());

    let queue = RenderQueue::start(Arc::clone(&pipeline), workers);
    let mut handles = Vec::with_capacity(pending.len());
    for job in pending {
        handles.push(queue.submit(job).await?);
    }

    let (mut completed, mut failed) = (0, 0);
    for handle in handles {
        let id = handle.job_id.clone();
        match handle.wait().await {
            Ok(job) if job.status == JobStatus::Completed => {
                completed += 1;
                println!("[OK]   {id} -> {}", job.output_path.as_deref().unwrap_or("-"));
            }
            Ok(job) => {
                failed += 1;
                println!(
                    "[FAIL] {id}: {}",
                    job.error_message.as_deref().unwrap_or("unknown error")
                );
            }
            Err(e) => {
                failed += 1;
                println!("[FAIL] {id}: {e}");
            }
        }
    }
    queue.shutdown().await;

    println!();
    println!("{completed} completed, {failed} failed");
    Ok(())
}
