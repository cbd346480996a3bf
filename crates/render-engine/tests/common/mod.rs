#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use promoreel_common::config::AppConfig;
use promoreel_common::error::{ReelError, ReelResult};
use promoreel_job_model::{MemoryJobRepository, TemplateRegistry};
use promoreel_render_engine::{
    EncoderBackend, EncoderOutput, LocalAssetStore, ProgressCallback, ReelPipeline,
};
use tempfile::TempDir;

/// Encoder double. Records every invocation and writes the output file
/// (the last argument) unless told to fail.
#[derive(Default)]
pub struct FakeEncoder {
    pub unavailable: bool,
    /// Invocations whose output path contains this fragment exit non-zero.
    pub fail_matching: Option<String>,
    /// Exit zero without writing anything.
    pub skip_output: bool,
    pub durations: HashMap<PathBuf, f64>,
    pub calls: Mutex<Vec<Vec<String>>>,
}

impl FakeEncoder {
    pub fn available() -> Self {
        Self::default()
    }

    pub fn missing() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn with_duration(mut self, path: impl Into<PathBuf>, secs: f64) -> Self {
        self.durations.insert(path.into(), secs);
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// Invocations that rendered a filter graph, in call order.
    pub fn render_calls(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter(|args| args.iter().any(|a| a == "-filter_complex"))
            .collect()
    }
}

impl EncoderBackend for FakeEncoder {
    fn name(&self) -> &str {
        "fake"
    }

    fn is_available(&self) -> bool {
        !self.unavailable
    }

    fn run(
        &self,
        args: &[String],
        _expected_secs: f64,
        _progress: Option<&ProgressCallback>,
    ) -> ReelResult<EncoderOutput> {
        self.calls.lock().unwrap().push(args.to_vec());
        let output = args.last().cloned().unwrap_or_default();

        if let Some(fragment) = &self.fail_matching {
            if output.contains(fragment.as_str()) {
                return Ok(EncoderOutput {
                    exit_code: Some(1),
                    stdout: String::new(),
                    stderr: "Error initializing complex filters".to_string(),
                });
            }
        }
        if !self.skip_output {
            std::fs::write(&output, b"fake media")?;
        }
        Ok(EncoderOutput {
            exit_code: Some(0),
            ..Default::default()
        })
    }

    fn probe_duration(&self, path: &Path) -> ReelResult<f64> {
        self.durations
            .get(path)
            .copied()
            .ok_or_else(|| ReelError::duration_probe(format!("no duration for {}", path.display())))
    }
}

pub struct Fixture {
    pub dir: TempDir,
    pub config: AppConfig,
    pub encoder: Arc<FakeEncoder>,
    pub jobs: Arc<MemoryJobRepository>,
    pub pipeline: ReelPipeline,
}

impl Fixture {
    pub fn new(build_encoder: impl FnOnce(&AppConfig) -> FakeEncoder) -> Self {
        Self::build(build_encoder, false)
    }

    /// Like [`Fixture::new`], with a logo file on disk in the asset store.
    pub fn with_logo(build_encoder: impl FnOnce(&AppConfig) -> FakeEncoder) -> Self {
        Self::build(build_encoder, true)
    }

    fn build(build_encoder: impl FnOnce(&AppConfig) -> FakeEncoder, logo: bool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::rooted_at(dir.path());
        let encoder = Arc::new(build_encoder(&config));
        let jobs = Arc::new(MemoryJobRepository::new());
        let mut store = LocalAssetStore::with_media(Default::default(), &config.music_dir);
        if logo {
            let path = config.storage_root.join("branding/logo.png");
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, b"png").unwrap();
            store = store.with_logo(path);
        }
        let pipeline = ReelPipeline::new(
            config.clone(),
            TemplateRegistry::builtin(),
            Arc::new(store),
            encoder.clone(),
            jobs.clone(),
        );
        Self {
            dir,
            config,
            encoder,
            jobs,
            pipeline,
        }
    }

    /// Relative media values for `n` property images.
    pub fn media_paths(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("villa/{i}.jpg")).collect()
    }

    /// Create a file under the storage root and return its relative path.
    pub fn write_storage_file(&self, relative: &str) -> String {
        let path = self.config.storage_root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"data").unwrap();
        relative.to_string()
    }
}

/// Value following `flag` in an argument list.
pub fn arg_after<'a>(args: &'a [String], flag: &str) -> &'a str {
    let at = args.iter().position(|a| a == flag).unwrap();
    &args[at + 1]
}
