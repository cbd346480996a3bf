//! Stale job detection.
//!
//! A crash mid-render leaves a job in `processing` forever. This module
//! only reports such jobs; it never changes their records.

use chrono::{DateTime, Duration, Utc};
use promoreel_common::error::{ReelError, ReelResult};
use promoreel_job_model::{JobId, JobRepository, JobStatus};
use serde::Serialize;

/// A job stuck in `processing`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleJob {
    pub job_id: JobId,
    pub template_id: String,
    pub age_secs: i64,
}

impl From<StaleJob> for ReelError {
    fn from(stale: StaleJob) -> Self {
        ReelError::StaleJob {
            job_id: stale.job_id,
            age_secs: stale.age_secs,
        }
    }
}

/// Jobs that have been `processing` for longer than `max_age`, oldest first.
pub fn detect_stale_jobs(
    repo: &dyn JobRepository,
    max_age: Duration,
    now: DateTime<Utc>,
) -> ReelResult<Vec<StaleJob>> {
    let threshold = max_age.num_seconds();
    let mut stale: Vec<StaleJob> = repo
        .list()?
        .into_iter()
        .filter(|job| job.status == JobStatus::Processing)
        .filter_map(|job| {
            let age_secs = job.secs_since_update(now);
            (age_secs > threshold).then(|| StaleJob {
                job_id: job.id,
                template_id: job.template_id,
                age_secs,
            })
        })
        .collect();

    stale.sort_by(|a, b| b.age_secs.cmp(&a.age_secs));
    for job in &stale {
        tracing::warn!(job_id = %job.job_id, age_secs = job.age_secs, "Job stuck in processing");
    }
    Ok(stale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use promoreel_job_model::{MemoryJobRepository, RenderJob, RenderOptions};

    fn job_updated_at(repo: &MemoryJobRepository, status: JobStatus, at: DateTime<Utc>) -> String {
        let mut job = RenderJob::new("luxury", RenderOptions::default());
        if status != JobStatus::Pending {
            job.mark_processing().unwrap();
        }
        if status == JobStatus::Completed {
            job.mark_completed("/o.mp4", None).unwrap();
        }
        job.updated_at = at;
        repo.save(&job).unwrap();
        job.id
    }

    #[test]
    fn test_only_old_processing_jobs_reported() {
        let repo = MemoryJobRepository::new();
        let now = Utc::now();
        let old = job_updated_at(&repo, JobStatus::Processing, now - Duration::hours(3));
        let older = job_updated_at(&repo, JobStatus::Processing, now - Duration::hours(5));
        job_updated_at(&repo, JobStatus::Processing, now - Duration::minutes(5));
        job_updated_at(&repo, JobStatus::Completed, now - Duration::hours(9));
        job_updated_at(&repo, JobStatus::Pending, now - Duration::hours(9));

        let stale = detect_stale_jobs(&repo, Duration::hours(1), now).unwrap();
        let ids: Vec<_> = stale.iter().map(|s| s.job_id.clone()).collect();
        assert_eq!(ids, vec![older, old]);
    }

    #[test]
    fn test_detection_does_not_mutate_records() {
        let repo = MemoryJobRepository::new();
        let now = Utc::now();
        let id = job_updated_at(&repo, JobStatus::Processing, now - Duration::days(1));

        let stale = detect_stale_jobs(&repo, Duration::hours(1), now).unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(repo.load(&id).unwrap().status, JobStatus::Processing);

        let err: ReelError = stale[0].clone().into();
        assert!(err.to_string().contains(&id));
    }
}
