//! Create a render job and render it in the foreground.

use promoreel_common::config::AppConfig;
use promoreel_job_model::{JobStatus, RenderJob};
use promoreel_render_engine::{ProgressCallback, ReelPipeline, RenderStage};

use crate::JobArgs;

pub fn run(config: AppConfig, args: JobArgs) -> anyhow::Result<()> {
    let pipeline = ReelPipeline::from_config(config)
        .map_err(|e| anyhow::anyhow!("Failed to set up pipeline: {e}"))?;

    let mut job = super::job_from_args(args)?;
    println!("Rendering job {} (template: {})", job.id, job.template_id);
    warn_if_simulated(&pipeline);

    pipeline.process(&mut job, Some(&progress_printer()))?;
    print_outcome(&job);
    Ok(())
}

pub fn warn_if_simulated(pipeline: &ReelPipeline) {
    if !pipeline.encoder().is_available() {
        println!(
            "  Encoder '{}' not found, rendering in simulation mode",
            pipeline.encoder().name()
        );
    }
}

/// Prints stage changes and an in-place encoding percentage.
pub fn progress_printer() -> ProgressCallback {
    Box::new(|p| match p.stage {
        RenderStage::Encoding => print!(
            "\r  Progress: {:.1}% (ETA: {:.0}s)  ",
            p.progress * 100.0,
            p.eta_secs,
        ),
        RenderStage::Complete | RenderStage::Failed => println!(),
        stage => println!("  {stage:?}"),
    })
}

pub fn print_outcome(job: &RenderJob) {
    if job.status != JobStatus::Completed {
        println!(
            "Render failed: {}",
            job.error_message.as_deref().unwrap_or("unknown error")
        );
        return;
    }

    println!("Render complete: {}", job.output_path.as_deref().unwrap_or("-"));
    if let Some(thumb) = &job.thumbnail_path {
        println!("  Thumbnail: {thumb}");
    }
    if let Some(bundle) = &job.bundle {
        match (&bundle.output_path, &bundle.error) {
            (Some(path), _) => println!("  {}: {path}", bundle.aspect_ratio.label()),
            (None, Some(err)) => println!("  {} failed: {err}", bundle.aspect_ratio.label()),
            (None, None) => {}
        }
    }
}
