//! Show job records.

use promoreel_common::config::AppConfig;
use promoreel_job_model::{JobRepository, JsonFileJobRepository, RenderJob};

/// Jobs listed when no limit is given.
pub const DEFAULT_LIST_LIMIT: usize = 20;

pub fn run(
    config: AppConfig,
    id: Option<String>,
    json: bool,
    limit: usize,
) -> anyhow::Result<()> {
    let repo = JsonFileJobRepository::open(&config.jobs_dir)
        .map_err(|e| anyhow::anyhow!("Failed to open job store: {e}"))?;

    match id {
        Some(id) => {
            let job = repo.load(&id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&job)?);
            } else {
                print_job(&job);
            }
        }
        None => {
            let (jobs, total) = recent_jobs(&repo, limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&jobs)?);
                return Ok(());
            }
            if jobs.is_empty() {
                println!("No jobs in {}", repo.dir().display());
            }
            for job in &jobs {
                println!(
                    "{}  {:<10}  {:<8}  {}",
                    job.id,
                    job.status.as_str(),
                    job.template_id,
                    job.updated_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
            if total > jobs.len() {
                println!("({} of {total} jobs shown, newest first)", jobs.len());
            }
        }
    }

    Ok(())
}

/// The `limit` most recent jobs and the total number of records.
pub fn recent_jobs(
    repo: &dyn JobRepository,
    limit: usize,
) -> anyhow::Result<(Vec<RenderJob>, usize)> {
    let mut jobs = repo.list()?;
    let total = jobs.len();
    jobs.truncate(limit);
    Ok((jobs, total))
}

fn print_job(job: &RenderJob) {
    println!("Job: {}", job.id);
    println!("  Status: {}", job.status);
    println!("  Template: {}", job.template_id);
    println!("  Created: {}", job.created_at);
    println!("  Updated: {}", job.updated_at);
    if let Some(title) = &job.options.title {
        println!("  Title: {title}");
    }
    println!(
        "  Media: {} id(s), {} path(s)",
        job.options.media_ids.len(),
        job.options.media_paths.len()
    );
    if let Some(output) = &job.output_path {
        println!("  Output: {output}");
    }
    if let Some(thumb) = &job.thumbnail_path {
        println!("  Thumbnail: {thumb}");
    }
    if let Some(bundle) = &job.bundle {
        println!(
            "  Bundle ({}): {}",
            bundle.aspect_ratio.label(),
            bundle
                .output_path
                .as_deref()
                .or(bundle.error.as_deref())
                .unwrap_or("-")
        );
    }
    if let Some(err) = &job.error_message {
        println!("  Error: {err}");
    }
}
