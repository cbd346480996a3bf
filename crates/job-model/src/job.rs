//! Render job records and their typed options.
//!
//! A job is created by the caller in `pending` and is afterwards mutated
//! only by the render pipeline. The status field is the single
//! synchronization point callers observe.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Job identifier.
pub type JobId = String;

/// Lifecycle of a render job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Completed and failed jobs never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// `pending -> processing -> {completed | failed}`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 9:16 vertical (reels/stories). Always rendered.
    #[serde(rename = "9:16")]
    Vertical,
    /// 1:1 square (feed posts). Rendered only in bundle mode.
    #[serde(rename = "1:1")]
    Square,
}

impl AspectRatio {
    /// Exact output frame size in pixels.
    pub fn frame_size(self) -> FrameSize {
        match self {
            AspectRatio::Vertical => FrameSize::new(720, 1280),
            AspectRatio::Square => FrameSize::new(720, 720),
        }
    }

    /// Short label used in file names and logs.
    pub fn label(self) -> &'static str {
        match self {
            AspectRatio::Vertical => "vertical",
            AspectRatio::Square => "square",
        }
    }
}

/// Output frame dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Typed job options. Unknown keys in incoming JSON are ignored and
/// missing keys take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Property name; drives the end card title and the persistent caption.
    pub title: Option<String>,

    /// Secondary end card line.
    pub subtitle: Option<String>,

    /// Location line shown under the subtitle on the end card.
    pub location: Option<String>,

    /// Ordered media identifiers resolved against the asset store.
    pub media_ids: Vec<u64>,

    /// Ordered raw paths or URLs.
    pub media_paths: Vec<String>,

    /// Voiceover audio produced upstream.
    pub audio_source: Option<String>,

    /// Theme keyword used for synthetic fallback media.
    pub visual_theme: Option<String>,

    /// Also render the 1:1 square variant.
    pub bundle_mode: bool,
}

impl RenderOptions {
    /// Trim text fields, turn blank values into `None`, and drop blank paths.
    pub fn normalized(&self) -> Self {
        fn clean(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }

        Self {
            title: clean(&self.title),
            subtitle: clean(&self.subtitle),
            location: clean(&self.location),
            media_ids: self.media_ids.clone(),
            media_paths: self
                .media_paths
                .iter()
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect(),
            audio_source: clean(&self.audio_source),
            visual_theme: clean(&self.visual_theme),
            bundle_mode: self.bundle_mode,
        }
    }
}

/// Result of the optional square render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleOutput {
    pub aspect_ratio: AspectRatio,

    /// Path of the rendered file, when the render succeeded.
    pub output_path: Option<String>,

    /// Why the render failed, when it did.
    pub error: Option<String>,
}

/// A render request and its observable outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderJob {
    pub id: JobId,

    /// Style template id. Unknown ids fall back to the default template.
    pub template_id: String,

    #[serde(default)]
    pub options: RenderOptions,

    #[serde(default)]
    pub status: JobStatus,

    /// Mandatory 9:16 render.
    #[serde(default)]
    pub output_path: Option<String>,

    /// Poster frame sampled from the mandatory render.
    #[serde(default)]
    pub thumbnail_path: Option<String>,

    /// Optional square render.
    #[serde(default)]
    pub bundle: Option<BundleOutput>,

    #[serde(default)]
    pub error_message: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl RenderJob {
    /// Create a pending job with a fresh identifier.
    pub fn new(template_id: impl Into<String>, options: RenderOptions) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            template_id: template_id.into(),
            options,
            status: JobStatus::Pending,
            output_path: None,
            thumbnail_path: None,
            bundle: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A fresh pending job carrying this job's template and options.
    ///
    /// The old record is left untouched, so a failed or stuck job keeps
    /// its error for inspection.
    pub fn retried(&self) -> Self {
        Self::new(self.template_id.clone(), self.options.clone())
    }

    /// Aspect ratios this job renders, mandatory one first.
    pub fn targets(&self) -> Vec<AspectRatio> {
        if self.options.bundle_mode {
            vec![AspectRatio::Vertical, AspectRatio::Square]
        } else {
            vec![AspectRatio::Vertical]
        }
    }

    fn transition(&mut self, next: JobStatus) -> Result<(), JobError> {
        if !self.status.can_transition_to(next) {
            return Err(JobError::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn mark_processing(&mut self) -> Result<(), JobError> {
        self.transition(JobStatus::Processing)
    }

    pub fn mark_completed(
        &mut self,
        output_path: impl Into<String>,
        thumbnail_path: Option<String>,
    ) -> Result<(), JobError> {
        self.transition(JobStatus::Completed)?;
        self.output_path = Some(output_path.into());
        self.thumbnail_path = thumbnail_path;
        self.error_message = None;
        Ok(())
    }

    pub fn mark_failed(&mut self, message: impl Into<String>) -> Result<(), JobError> {
        self.transition(JobStatus::Failed)?;
        self.error_message = Some(message.into());
        Ok(())
    }

    /// Seconds since the last status write.
    pub fn secs_since_update(&self, now: DateTime<Utc>) -> i64 {
        (now - self.updated_at).num_seconds()
    }
}

/// Errors that can occur when working with job records.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Job not found: {id}")]
    NotFound { id: JobId },
}

impl From<JobError> for promoreel_common::ReelError {
    fn from(err: JobError) -> Self {
        promoreel_common::ReelError::job(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_status() -> impl Strategy<Value = JobStatus> {
        prop_oneof![
            Just(JobStatus::Pending),
            Just(JobStatus::Processing),
            Just(JobStatus::Completed),
            Just(JobStatus::Failed),
        ]
    }

    proptest! {
        #[test]
        fn prop_terminal_status_is_final(steps in proptest::collection::vec(any_status(), 0..12)) {
            let mut job = RenderJob::new("luxury", RenderOptions::default());
            let mut reached_terminal = None;
            for next in steps {
                let before = job.status;
                let result = match next {
                    JobStatus::Pending => continue,
                    JobStatus::Processing => job.mark_processing(),
                    JobStatus::Completed => job.mark_completed("/o.mp4", None),
                    JobStatus::Failed => job.mark_failed("boom"),
                };
                prop_assert_eq!(result.is_ok(), before.can_transition_to(next));
                if result.is_err() {
                    prop_assert_eq!(job.status, before);
                }
                if let Some(terminal) = reached_terminal {
                    prop_assert_eq!(job.status, terminal);
                } else if job.status.is_terminal() {
                    reached_terminal = Some(job.status);
                }
            }
        }
    }

    #[test]
    fn test_status_machine() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Processing));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn test_job_lifecycle() {
        let mut job = RenderJob::new("luxury", RenderOptions::default());
        assert_eq!(job.status, JobStatus::Pending);

        job.mark_processing().unwrap();
        job.mark_completed("/out/video.mp4", Some("/out/video.jpg".to_string()))
            .unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.output_path.as_deref(), Some("/out/video.mp4"));

        let err = job.mark_failed("late").unwrap_err();
        assert!(matches!(err, JobError::InvalidTransition { .. }));
        assert!(job.error_message.is_none());
    }

    #[test]
    fn test_cannot_skip_processing() {
        let mut job = RenderJob::new("luxury", RenderOptions::default());
        assert!(job.mark_failed("boom").is_err());
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[test]
    fn test_retried_job_starts_over() {
        let mut job = RenderJob::new(
            "party",
            RenderOptions {
                title: Some("Loft 9".to_string()),
                bundle_mode: true,
                ..RenderOptions::default()
            },
        );
        job.mark_processing().unwrap();
        job.mark_failed("encoder exploded").unwrap();

        let retry = job.retried();
        assert_ne!(retry.id, job.id);
        assert_eq!(retry.status, JobStatus::Pending);
        assert_eq!(retry.template_id, "party");
        assert_eq!(retry.options, job.options);
        assert!(retry.error_message.is_none());
        assert!(retry.output_path.is_none());
        assert_eq!(job.status, JobStatus::Failed);
    }

    #[test]
    fn test_targets_follow_bundle_flag() {
        let mut job = RenderJob::new("party", RenderOptions::default());
        assert_eq!(job.targets(), vec![AspectRatio::Vertical]);

        job.options.bundle_mode = true;
        assert_eq!(
            job.targets(),
            vec![AspectRatio::Vertical, AspectRatio::Square]
        );
    }

    #[test]
    fn test_options_deserialize_with_unknown_and_missing_keys() {
        let json = r#"{"title":"Villa Azul","media_ids":[3,1],"script":"x","branding":true}"#;
        let options: RenderOptions = serde_json::from_str(json).unwrap();
        assert_eq!(options.title.as_deref(), Some("Villa Azul"));
        assert_eq!(options.media_ids, vec![3, 1]);
        assert!(options.media_paths.is_empty());
        assert!(!options.bundle_mode);
    }

    #[test]
    fn test_normalized_drops_blank_values() {
        let options = RenderOptions {
            title: Some("  Casa Mar  ".to_string()),
            subtitle: Some("   ".to_string()),
            media_paths: vec!["a.jpg".to_string(), " ".to_string()],
            visual_theme: Some(String::new()),
            ..RenderOptions::default()
        }
        .normalized();

        assert_eq!(options.title.as_deref(), Some("Casa Mar"));
        assert!(options.subtitle.is_none());
        assert!(options.visual_theme.is_none());
        assert_eq!(options.media_paths, vec!["a.jpg".to_string()]);
    }

    #[test]
    fn test_aspect_ratio_serialization() {
        assert_eq!(
            serde_json::to_string(&AspectRatio::Vertical).unwrap(),
            "\"9:16\""
        );
        assert_eq!(AspectRatio::Square.frame_size(), FrameSize::new(720, 720));
        assert_eq!(AspectRatio::Vertical.frame_size(), FrameSize::new(720, 1280));
    }

    #[test]
    fn test_job_error_converts_to_reel_error() {
        let err: promoreel_common::ReelError = JobError::NotFound { id: "x1".into() }.into();
        assert_eq!(err.to_string(), "Job error: Job not found: x1");
    }

    #[test]
    fn test_job_serialization() {
        let job = RenderJob::new("reels", RenderOptions::default());
        let json = serde_json::to_string_pretty(&job).unwrap();
        let parsed: RenderJob = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, job.id);
        assert_eq!(parsed.status, JobStatus::Pending);
    }
}
