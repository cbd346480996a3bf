pub mod check;
pub mod delete;
pub mod init;
pub mod plan;
pub mod queue;
pub mod render;
pub mod retry;
pub mod stale;
pub mod status;
pub mod submit;
pub mod templates;

use anyhow::Context;
use promoreel_job_model::{RenderJob, RenderOptions, DEFAULT_TEMPLATE_ID};
use serde::Deserialize;

use crate::JobArgs;

/// Job file accepted by `--from`.
#[derive(Debug, Deserialize)]
struct JobFile {
    #[serde(default = "default_template_id")]
    template_id: String,
    #[serde(default)]
    options: RenderOptions,
}

fn default_template_id() -> String {
    DEFAULT_TEMPLATE_ID.to_string()
}

/// A pending job built from a job file or from command-line options.
pub fn job_from_args(args: JobArgs) -> anyhow::Result<RenderJob> {
    if let Some(path) = &args.from {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read job file {}", path.display()))?;
        let file: JobFile = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse job file {}", path.display()))?;
        return Ok(RenderJob::new(file.template_id, file.options));
    }

    Ok(RenderJob::new(
        args.template,
        RenderOptions {
            title: args.title,
            subtitle: args.subtitle,
            location: args.location,
            media_ids: args.media_ids,
            media_paths: args.media_paths,
            audio_source: args.voiceover,
            visual_theme: args.theme,
            bundle_mode: args.bundle,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_file_defaults() {
        let file: JobFile = serde_json::from_str(r#"{"options": {"title": "Loft 9"}}"#).unwrap();
        assert_eq!(file.template_id, "luxury");
        assert_eq!(file.options.title.as_deref(), Some("Loft 9"));
        assert!(!file.options.bundle_mode);
    }
}
