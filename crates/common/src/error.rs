//! Error types shared across Promoreel crates.

use std::path::PathBuf;

/// Top-level error type for Promoreel operations.
#[derive(Debug, thiserror::Error)]
pub enum ReelError {
    #[error("Asset resolution error: {message}")]
    AssetResolution { message: String },

    #[error("Encoder invocation error: {message}")]
    EncoderInvocation { message: String },

    #[error("Duration measurement error: {message}")]
    DurationProbe { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Job {job_id} has been processing for {age_secs}s without completing")]
    StaleJob { job_id: String, age_secs: i64 },

    #[error("Job error: {message}")]
    Job { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ReelError.
pub type ReelResult<T> = Result<T, ReelError>;

impl ReelError {
    pub fn asset_resolution(msg: impl Into<String>) -> Self {
        Self::AssetResolution {
            message: msg.into(),
        }
    }

    pub fn encoder(msg: impl Into<String>) -> Self {
        Self::EncoderInvocation {
            message: msg.into(),
        }
    }

    pub fn duration_probe(msg: impl Into<String>) -> Self {
        Self::DurationProbe {
            message: msg.into(),
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    pub fn job(msg: impl Into<String>) -> Self {
        Self::Job {
            message: msg.into(),
        }
    }

    /// Whether this error came from the external encoding engine.
    pub fn is_encoder_failure(&self) -> bool {
        matches!(self, Self::EncoderInvocation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_category() {
        let err = ReelError::asset_resolution("no media");
        assert_eq!(err.to_string(), "Asset resolution error: no media");

        let err = ReelError::encoder("exit status 1");
        assert!(err.is_encoder_failure());
        assert!(err.to_string().starts_with("Encoder invocation error"));
    }

    #[test]
    fn test_stale_job_message() {
        let err = ReelError::StaleJob {
            job_id: "42".to_string(),
            age_secs: 3600,
        };
        assert_eq!(
            err.to_string(),
            "Job 42 has been processing for 3600s without completing"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ReelError = io.into();
        assert!(matches!(err, ReelError::Io(_)));
    }
}
