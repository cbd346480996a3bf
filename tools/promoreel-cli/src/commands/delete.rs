//! Remove a job record and its files.

use promoreel_common::config::AppConfig;
use promoreel_render_engine::ReelPipeline;

pub fn run(config: AppConfig, id: String) -> anyhow::Result<()> {
    let pipeline = ReelPipeline::from_config(config)
        .map_err(|e| anyhow::anyhow!("Failed to set up pipeline: {e}"))?;

    let job = pipeline.delete_job(&id)?;
    println!("Deleted job {} ({})", job.id, job.status);
    if let Some(output) = &job.output_path {
        println!("  Removed: {output}");
    }
    Ok(())
}
