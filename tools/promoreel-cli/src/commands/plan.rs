//! Print the render plan for a job without encoding.

use promoreel_common::config::AppConfig;
use promoreel_render_engine::emitter::encoder_args;
use promoreel_render_engine::ReelPipeline;

use crate::JobArgs;

pub fn run(config: AppConfig, args: JobArgs, print_args: bool) -> anyhow::Result<()> {
    let pipeline = ReelPipeline::from_config(config)
        .map_err(|e| anyhow::anyhow!("Failed to set up pipeline: {e}"))?;

    let job = super::job_from_args(args)?;
    let plans = pipeline.plan_job(&job)?;

    for plan in &plans {
        if print_args {
            let output = pipeline
                .config()
                .output_dir
                .join(format!("plan_{}_{}.mp4", job.id, plan.aspect.label()));
            let args = encoder_args(plan, &output, &pipeline.config().render);
            println!("ffmpeg {}", args.join(" "));
        } else {
            println!("{}", serde_json::to_string_pretty(plan)?);
        }
    }

    Ok(())
}
