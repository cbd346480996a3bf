//! Job pipeline.
//!
//! Drives one job from `pending` through `processing` to a terminal
//! status. Every stage error is caught here and written into the job's
//! error message; only the square bundle render may fail without failing
//! the job.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use promoreel_common::config::AppConfig;
use promoreel_common::error::{ReelError, ReelResult};
use promoreel_job_model::{
    AspectRatio, BundleOutput, JobRepository, JobStatus, JsonFileJobRepository, RenderJob,
    RenderOptions, StyleTemplate, TemplateRegistry,
};

use crate::assets::{
    AssetResolver, AssetRole, AssetStore, LocalAssetStore, MediaAsset, ResolvedAssets,
};
use crate::audio::Voiceover;
use crate::emitter::Emitter;
use crate::encoder::{
    EncoderBackend, FfmpegBackend, ProgressCallback, RenderProgress, RenderStage,
};
use crate::plan::{compose_plan, PlanInputs, RenderPlan};

/// Job inputs resolved once and shared by every aspect ratio.
#[derive(Debug, Clone)]
pub struct PreparedJob {
    pub options: RenderOptions,
    pub template: StyleTemplate,
    pub assets: ResolvedAssets,
    pub voiceover: Option<Voiceover>,
    pub logo: Option<MediaAsset>,
    pub track_path: PathBuf,
}

#[derive(Debug)]
struct Rendered {
    output_path: PathBuf,
    thumbnail_path: Option<PathBuf>,
    bundle: Option<BundleOutput>,
}

/// The composition engine with its collaborators.
#[derive(Clone)]
pub struct ReelPipeline {
    config: Arc<AppConfig>,
    registry: Arc<TemplateRegistry>,
    store: Arc<dyn AssetStore>,
    encoder: Arc<dyn EncoderBackend>,
    jobs: Arc<dyn JobRepository>,
}

impl ReelPipeline {
    pub fn new(
        config: AppConfig,
        registry: TemplateRegistry,
        store: Arc<dyn AssetStore>,
        encoder: Arc<dyn EncoderBackend>,
        jobs: Arc<dyn JobRepository>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            store,
            encoder,
            jobs,
        }
    }

    /// Local store, ffmpeg backend and JSON job records, all from config.
    pub fn from_config(config: AppConfig) -> ReelResult<Self> {
        if config.render.fps == 0 {
            return Err(ReelError::configuration("render.fps must be at least 1"));
        }
        let store = LocalAssetStore::from_config(&config)?;
        let encoder = FfmpegBackend::new(&config.encoder);
        let jobs = JsonFileJobRepository::open(&config.jobs_dir)?;
        Ok(Self::new(
            config,
            TemplateRegistry::builtin(),
            Arc::new(store),
            Arc::new(encoder),
            Arc::new(jobs),
        ))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    pub fn encoder(&self) -> &dyn EncoderBackend {
        self.encoder.as_ref()
    }

    pub fn jobs(&self) -> &dyn JobRepository {
        self.jobs.as_ref()
    }

    /// Resolve template, assets, voiceover and logo for a job.
    pub fn prepare(&self, job: &RenderJob) -> ReelResult<PreparedJob> {
        let options = job.options.normalized();
        let template = self.registry.resolve(&job.template_id).clone();

        let resolver = AssetResolver::new(&self.config, self.store.as_ref(), self.encoder.as_ref());
        let assets = resolver.resolve(&options)?;

        let voiceover = options
            .audio_source
            .as_deref()
            .and_then(|source| self.resolve_voiceover(source));

        let logo = self.store.logo_path().map(|path| MediaAsset {
            path: path.display().to_string(),
            position: 0,
            role: AssetRole::Logo,
        });

        let track_path = self.store.track_path(&template.background_track);

        Ok(PreparedJob {
            options,
            template,
            assets,
            voiceover,
            logo,
            track_path,
        })
    }

    /// Compose the plan for one aspect ratio.
    pub fn plan_for(
        &self,
        job: &RenderJob,
        prepared: &PreparedJob,
        aspect: AspectRatio,
    ) -> ReelResult<RenderPlan> {
        compose_plan(PlanInputs {
            job_id: &job.id,
            aspect,
            template: &prepared.template,
            assets: &prepared.assets.assets,
            options: &prepared.options,
            voiceover: prepared.voiceover.clone(),
            track_path: prepared.track_path.clone(),
            logo: prepared.logo.clone(),
            fps: self.config.render.fps,
            call_to_action: &self.config.render.call_to_action,
        })
    }

    /// Plans for every target of a job, without encoding.
    pub fn plan_job(&self, job: &RenderJob) -> ReelResult<Vec<RenderPlan>> {
        let prepared = self.prepare(job)?;
        job.targets()
            .into_iter()
            .map(|aspect| self.plan_for(job, &prepared, aspect))
            .collect()
    }

    /// Load a stored job, process it and return the final record.
    pub fn run_job(&self, id: &str, progress: Option<&ProgressCallback>) -> ReelResult<RenderJob> {
        let mut job = self.jobs.load(id)?;
        self.process(&mut job, progress)?;
        Ok(job)
    }

    /// Store a fresh pending copy of a job. The old record is kept.
    pub fn retry_job(&self, id: &str) -> ReelResult<RenderJob> {
        let old = self.jobs.load(id)?;
        let job = old.retried();
        self.jobs.save(&job)?;
        tracing::info!(job_id = %job.id, retried_from = %old.id, "Queued retry");
        Ok(job)
    }

    /// Remove a job record together with every file it produced.
    ///
    /// A job that is still processing is refused.
    pub fn delete_job(&self, id: &str) -> ReelResult<RenderJob> {
        let job = self.jobs.load(id)?;
        if job.status == JobStatus::Processing {
            return Err(ReelError::job(format!("Job {id} is still processing")));
        }

        let outputs = job
            .output_path
            .iter()
            .chain(job.bundle.iter().filter_map(|b| b.output_path.as_ref()))
            .map(PathBuf::from);
        let mut files: Vec<PathBuf> = job.thumbnail_path.iter().map(PathBuf::from).collect();
        for output in outputs {
            files.push(output.with_extension("ffmpeg-debug.txt"));
            files.push(output);
        }

        for file in &files {
            match std::fs::remove_file(file) {
                Ok(()) => tracing::debug!(path = %file.display(), "Removed job file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        let removed = self.jobs.delete(id)?;
        tracing::info!(job_id = %id, files = files.len(), "Deleted render job");
        Ok(removed)
    }

    /// Move a pending job to its terminal status.
    ///
    /// Returns `Err` only when the job record itself cannot be updated;
    /// render failures end up in `job.error_message`.
    pub fn process(
        &self,
        job: &mut RenderJob,
        progress: Option<&ProgressCallback>,
    ) -> ReelResult<JobStatus> {
        job.mark_processing()?;
        self.jobs.save(job)?;
        tracing::info!(job_id = %job.id, template = %job.template_id, "Processing render job");

        match self.render(job, progress) {
            Ok(rendered) => {
                job.bundle = rendered.bundle;
                job.mark_completed(
                    rendered.output_path.display().to_string(),
                    rendered.thumbnail_path.map(|p| p.display().to_string()),
                )?;
                tracing::info!(
                    job_id = %job.id,
                    output = ?job.output_path,
                    "Render job completed"
                );
                if let Some(cb) = progress {
                    cb(RenderProgress::at(RenderStage::Complete, 1.0));
                }
            }
            Err(err) => {
                tracing::error!(
                    job_id = %job.id,
                    encoder_failure = err.is_encoder_failure(),
                    error = %err,
                    "Render job failed"
                );
                job.mark_failed(err.to_string())?;
                if let Some(cb) = progress {
                    cb(RenderProgress::at(RenderStage::Failed, 0.0));
                }
            }
        }

        self.jobs.save(job)?;
        Ok(job.status)
    }

    fn render(&self, job: &RenderJob, progress: Option<&ProgressCallback>) -> ReelResult<Rendered> {
        if let Some(cb) = progress {
            cb(RenderProgress::at(RenderStage::ResolvingAssets, 0.0));
        }
        let prepared = self.prepare(job)?;

        if let Some(cb) = progress {
            cb(RenderProgress::at(RenderStage::Planning, 0.0));
        }
        let emitter = Emitter::new(self.encoder.as_ref(), &self.config.render);
        let token = uuid::Uuid::new_v4().simple().to_string();

        let primary = self.plan_for(job, &prepared, AspectRatio::Vertical)?;
        let primary_out = self.output_path(job, &token[..8], AspectRatio::Vertical);
        let outcome = emitter.emit(&primary, &primary_out, progress)?;
        if outcome.simulated {
            tracing::warn!(job_id = %job.id, "Job completed in simulation mode");
        }

        let bundle = job
            .targets()
            .into_iter()
            .filter(|aspect| *aspect != AspectRatio::Vertical)
            .map(|aspect| {
                let output = self.output_path(job, &token[..8], aspect);
                let result = self
                    .plan_for(job, &prepared, aspect)
                    .and_then(|plan| emitter.emit(&plan, &output, None));
                match result {
                    Ok(done) => BundleOutput {
                        aspect_ratio: aspect,
                        output_path: Some(done.output_path.display().to_string()),
                        error: None,
                    },
                    Err(err) => {
                        tracing::warn!(
                            job_id = %job.id,
                            aspect = aspect.label(),
                            error = %err,
                            "Bundle render failed, keeping primary output"
                        );
                        BundleOutput {
                            aspect_ratio: aspect,
                            output_path: None,
                            error: Some(err.to_string()),
                        }
                    }
                }
            })
            .next();

        Ok(Rendered {
            output_path: outcome.output_path,
            thumbnail_path: outcome.thumbnail_path,
            bundle,
        })
    }

    fn output_path(&self, job: &RenderJob, token: &str, aspect: AspectRatio) -> PathBuf {
        let name = match aspect {
            AspectRatio::Vertical => format!("video_{}_{token}.mp4", job.id),
            AspectRatio::Square => format!("video_{}_{token}_square.mp4", job.id),
        };
        self.config.output_dir.join(name)
    }

    /// Existing voiceover file and its duration. Unmeasurable files count as
    /// zero seconds, which keeps tempo timing.
    fn resolve_voiceover(&self, source: &str) -> Option<Voiceover> {
        let path = if Path::new(source).is_absolute() {
            PathBuf::from(source)
        } else {
            self.config.storage_root.join(source)
        };

        if !path.exists() {
            tracing::warn!(path = %path.display(), "Voiceover file missing, rendering music only");
            return None;
        }

        let duration_secs = match self.encoder.probe_duration(&path) {
            Ok(secs) => secs,
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "Voiceover duration unmeasurable, using tempo timing"
                );
                0.0
            }
        };

        Some(Voiceover {
            path: path.display().to_string(),
            duration_secs,
        })
    }
}

impl std::fmt::Debug for ReelPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReelPipeline")
            .field("encoder", &self.encoder.name())
            .field("templates", &self.registry.len())
            .field("output_dir", &self.config.output_dir)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_rejects_zero_fps() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::rooted_at(dir.path());
        config.render.fps = 0;
        let err = ReelPipeline::from_config(config).unwrap_err();
        assert!(matches!(err, ReelError::Configuration { .. }));
    }

    #[test]
    fn test_from_config_creates_job_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::rooted_at(dir.path());
        let pipeline = ReelPipeline::from_config(config).unwrap();
        assert!(pipeline.config().jobs_dir.is_dir());
        assert_eq!(pipeline.encoder().name(), "ffmpeg");
        assert!(pipeline.jobs().list().unwrap().is_empty());
    }
}
