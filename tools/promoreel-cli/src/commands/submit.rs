//! Store a pending job for a later `queue` run.

use promoreel_common::config::AppConfig;
use promoreel_job_model::{JobRepository, JsonFileJobRepository, RenderJob};

use crate::JobArgs;

pub fn run(config: AppConfig, args: JobArgs) -> anyhow::Result<()> {
    let job = submit(&config, args)?;
    println!("Queued job {} (template: {})", job.id, job.template_id);
    println!("  Render pending jobs with: promoreel queue");
    Ok(())
}

/// Build a job from the arguments and save it as pending.
pub fn submit(config: &AppConfig, args: JobArgs) -> anyhow::Result<RenderJob> {
    let repo = JsonFileJobRepository::open(&config.jobs_dir)
        .map_err(|e| anyhow::anyhow!("Failed to open job store: {e}"))?;
    let job = super::job_from_args(args)?;
    repo.save(&job)?;
    tracing::info!(job_id = %job.id, template = %job.template_id, "Submitted render job");
    Ok(job)
}
