//! Start a job over as a new pending record.

use promoreel_common::config::AppConfig;
use promoreel_render_engine::ReelPipeline;

use super::render::{print_outcome, progress_printer, warn_if_simulated};

pub fn run(config: AppConfig, id: String, now: bool) -> anyhow::Result<()> {
    let pipeline = ReelPipeline::from_config(config)
        .map_err(|e| anyhow::anyhow!("Failed to set up pipeline: {e}"))?;

    let job = pipeline.retry_job(&id)?;
    println!("Retrying {id} as job {}", job.id);
    if !now {
        println!("  Render pending jobs with: promoreel queue");
        return Ok(());
    }

    warn_if_simulated(&pipeline);
    let done = pipeline.run_job(&job.id, Some(&progress_printer()))?;
    print_outcome(&done);
    Ok(())
}
