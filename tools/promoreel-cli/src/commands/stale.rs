//! Report jobs stuck in processing.

use promoreel_common::config::AppConfig;
use promoreel_job_model::JsonFileJobRepository;
use promoreel_render_engine::detect_stale_jobs;

pub fn run(config: AppConfig, max_age_mins: i64) -> anyhow::Result<()> {
    let repo = JsonFileJobRepository::open(&config.jobs_dir)
        .map_err(|e| anyhow::anyhow!("Failed to open job store: {e}"))?;

    let stale = detect_stale_jobs(
        &repo,
        chrono::Duration::minutes(max_age_mins),
        chrono::Utc::now(),
    )?;

    if stale.is_empty() {
        println!("No jobs processing for more than {max_age_mins} minute(s).");
        return Ok(());
    }

    println!("{} stale job(s):", stale.len());
    for job in &stale {
        println!(
            "  {}  {:<8}  processing for {}m",
            job.job_id,
            job.template_id,
            job.age_secs / 60
        );
    }
    Ok(())
}
