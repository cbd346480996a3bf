//! Job record storage.
//!
//! Each status update is an independent single-record write. Nothing
//! spans a whole render, so a crash mid-render leaves the record in
//! `processing`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::job::{JobError, JobId, RenderJob};

/// Persistence for job records.
pub trait JobRepository: Send + Sync {
    /// Insert or overwrite a job record.
    fn save(&self, job: &RenderJob) -> Result<(), JobError>;

    /// Fetch a job record by id.
    fn load(&self, id: &str) -> Result<RenderJob, JobError>;

    /// All known job records, newest first.
    fn list(&self) -> Result<Vec<RenderJob>, JobError>;

    /// Remove a job record and return it.
    fn delete(&self, id: &str) -> Result<RenderJob, JobError>;
}

fn newest_first(jobs: &mut [RenderJob]) {
    jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Process-local repository.
#[derive(Debug, Default)]
pub struct MemoryJobRepository {
    jobs: Mutex<BTreeMap<JobId, RenderJob>>,
}

impl MemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn jobs(&self) -> std::sync::MutexGuard<'_, BTreeMap<JobId, RenderJob>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl JobRepository for MemoryJobRepository {
    fn save(&self, job: &RenderJob) -> Result<(), JobError> {
        self.jobs().insert(job.id.clone(), job.clone());
        Ok(())
    }

    fn load(&self, id: &str) -> Result<RenderJob, JobError> {
        self.jobs()
            .get(id)
            .cloned()
            .ok_or_else(|| JobError::NotFound { id: id.to_string() })
    }

    fn list(&self) -> Result<Vec<RenderJob>, JobError> {
        let mut jobs: Vec<RenderJob> = self.jobs().values().cloned().collect();
        newest_first(&mut jobs);
        Ok(jobs)
    }

    fn delete(&self, id: &str) -> Result<RenderJob, JobError> {
        self.jobs()
            .remove(id)
            .ok_or_else(|| JobError::NotFound { id: id.to_string() })
    }
}

/// One pretty-printed `<id>.json` file per job.
#[derive(Debug, Clone)]
pub struct JsonFileJobRepository {
    dir: PathBuf,
}

impl JsonFileJobRepository {
    /// Open (and create if needed) a job directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, JobError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| JobError::IoError {
            path: dir.clone(),
            source: e,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn job_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn read_job(path: &Path) -> Result<RenderJob, JobError> {
        let json = std::fs::read_to_string(path).map_err(|e| JobError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| JobError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

impl JobRepository for JsonFileJobRepository {
    fn save(&self, job: &RenderJob) -> Result<(), JobError> {
        let path = self.job_path(&job.id);
        let json = serde_json::to_string_pretty(job).map_err(|e| JobError::ParseError {
            path: path.clone(),
            source: e,
        })?;

        // Pollers must never observe a half-written record.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| JobError::IoError {
            path: tmp.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| JobError::IoError { path, source: e })
    }

    fn load(&self, id: &str) -> Result<RenderJob, JobError> {
        let path = self.job_path(id);
        if !path.exists() {
            return Err(JobError::NotFound { id: id.to_string() });
        }
        Self::read_job(&path)
    }

    fn list(&self) -> Result<Vec<RenderJob>, JobError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| JobError::IoError {
            path: self.dir.clone(),
            source: e,
        })?;

        let mut jobs = vec![];
        for entry in entries {
            let entry = entry.map_err(|e| JobError::IoError {
                path: self.dir.clone(),
                source: e,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_job(&path) {
                Ok(job) => jobs.push(job),
                Err(e) => tracing::warn!(error = %e, "Skipping unreadable job record"),
            }
        }
        newest_first(&mut jobs);
        Ok(jobs)
    }

    fn delete(&self, id: &str) -> Result<RenderJob, JobError> {
        let job = self.load(id)?;
        let path = self.job_path(id);
        std::fs::remove_file(&path).map_err(|e| JobError::IoError { path, source: e })?;
        Ok(job)
    }
}
