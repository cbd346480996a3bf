//! External encoder backends.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use promoreel_common::config::EncoderConfig;
use promoreel_common::error::{ReelError, ReelResult};

/// Progress callback for render progress.
pub type ProgressCallback = Box<dyn Fn(RenderProgress) + Send + Sync>;

/// Render progress report.
#[derive(Debug, Clone)]
pub struct RenderProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    /// Current stage.
    pub stage: RenderStage,
}

impl RenderProgress {
    pub fn at(stage: RenderStage, progress: f64) -> Self {
        Self {
            progress,
            eta_secs: 0.0,
            stage,
        }
    }
}

/// Stages of a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    ResolvingAssets,
    Planning,
    Encoding,
    Thumbnail,
    Complete,
    Failed,
}

/// What an encoder process left behind.
#[derive(Debug, Clone, Default)]
pub struct EncoderOutput {
    /// Process exit code. `None` when killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl EncoderOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Trait for encoder backends (ffmpeg, test doubles).
pub trait EncoderBackend: Send + Sync {
    /// Backend name.
    fn name(&self) -> &str;

    /// Check if the encoder binary is available on the system.
    fn is_available(&self) -> bool;

    /// Run one encoder invocation to completion.
    ///
    /// Returns `Err` only when the process could not be started or read;
    /// a non-zero exit is reported through [`EncoderOutput`].
    fn run(
        &self,
        args: &[String],
        expected_secs: f64,
        progress: Option<&ProgressCallback>,
    ) -> ReelResult<EncoderOutput>;

    /// Measure a media file's duration in seconds.
    fn probe_duration(&self, path: &Path) -> ReelResult<f64>;
}

/// How long encoded time may stand still before a stall is logged.
const STALL_LIMIT: Duration = Duration::from_secs(10);

/// Backend driving the `ffmpeg` and `ffprobe` binaries.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg: String,
    ffprobe: String,
}

impl FfmpegBackend {
    pub fn new(config: &EncoderConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg_binary.clone(),
            ffprobe: config.ffprobe_binary.clone(),
        }
    }

    /// Whether the prober binary is on the system.
    pub fn probe_available(&self) -> bool {
        command_exists(&self.ffprobe)
    }
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new(&EncoderConfig::default())
    }
}

impl EncoderBackend for FfmpegBackend {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn is_available(&self) -> bool {
        command_exists(&self.ffmpeg)
    }

    fn run(
        &self,
        args: &[String],
        expected_secs: f64,
        progress: Option<&ProgressCallback>,
    ) -> ReelResult<EncoderOutput> {
        tracing::debug!(args = ?args, "Running ffmpeg");
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let start = Instant::now();
        let mut child = cmd
            .spawn()
            .map_err(|e| ReelError::encoder(format!("Failed to start ffmpeg: {e}")))?;

        tracing::info!(
            pid = child.id(),
            args_len = args.len(),
            expected_secs,
            "ffmpeg process started"
        );

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ReelError::encoder("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ReelError::encoder("Failed to capture ffmpeg stderr"))?;

        // ffmpeg blocks once the stderr pipe fills up.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let mut reader = BufReader::new(stdout);
        let mut line = String::new();
        let mut captured = String::new();

        let mut encoded_secs = 0.0f64;
        let mut stall = StallWatch::new(start);
        loop {
            line.clear();
            let bytes = reader
                .read_line(&mut line)
                .map_err(|e| ReelError::encoder(format!("Failed reading ffmpeg progress: {e}")))?;
            if bytes == 0 {
                break;
            }

            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            if !text.contains('=') {
                captured.push_str(text);
                captured.push('\n');
                continue;
            }

            let finished = match ProgressLine::parse(text) {
                Some(ProgressLine::OutTime(secs)) => {
                    encoded_secs = secs;
                    continue;
                }
                Some(ProgressLine::BlockEnd { finished }) => finished,
                None => continue,
            };

            if let Some(stuck) = stall.observe(encoded_secs, Instant::now()) {
                tracing::warn!(
                    encoded_secs,
                    stuck_secs = stuck.as_secs(),
                    elapsed_secs = start.elapsed().as_secs_f64(),
                    "ffmpeg output time is not advancing"
                );
            }
            if let Some(cb) = progress {
                cb(if finished {
                    RenderProgress::at(RenderStage::Encoding, 1.0)
                } else {
                    progress_report(encoded_secs, expected_secs, start.elapsed().as_secs_f64())
                });
            }
        }

        let status = child
            .wait()
            .map_err(|e| ReelError::encoder(format!("Failed to wait on ffmpeg: {e}")))?;

        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        tracing::info!(
            exit_code = ?status.code(),
            elapsed_ms = start.elapsed().as_millis(),
            "ffmpeg process finished"
        );

        Ok(EncoderOutput {
            exit_code: status.code(),
            stdout: captured,
            stderr: stderr_output,
        })
    }

    fn probe_duration(&self, path: &Path) -> ReelResult<f64> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .map_err(|e| ReelError::duration_probe(format!("Failed to start ffprobe: {e}")))?;

        if !output.status.success() {
            return Err(ReelError::duration_probe(format!(
                "ffprobe failed on {} (status {}): {}",
                path.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_probe_duration(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
            ReelError::duration_probe(format!("No duration reported for {}", path.display()))
        })
    }
}

/// First positive finite number in prober output.
fn parse_probe_duration(raw: &str) -> Option<f64> {
    raw.lines()
        .filter_map(|line| line.trim().parse::<f64>().ok())
        .find(|secs| secs.is_finite() && *secs > 0.0)
}

/// Whether a binary resolves on `PATH` (or as a path).
pub fn command_exists(binary: &str) -> bool {
    if binary.contains('/') {
        return Path::new(binary).is_file();
    }
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// A line of ffmpeg `-progress` output that the renderer reacts to.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ProgressLine {
    /// Media time written so far, in seconds.
    OutTime(f64),
    /// Closes a progress block. `finished` marks the last one.
    BlockEnd { finished: bool },
}

impl ProgressLine {
    fn parse(line: &str) -> Option<Self> {
        let (key, value) = line.split_once('=')?;
        match key {
            // Both keys carry microseconds.
            "out_time_us" | "out_time_ms" => {
                let micros: f64 = value.parse().ok()?;
                Some(Self::OutTime(micros / 1_000_000.0))
            }
            "progress" => Some(Self::BlockEnd {
                finished: value == "end",
            }),
            _ => None,
        }
    }
}

/// Tracks when the encoded time last moved forward.
#[derive(Debug)]
struct StallWatch {
    encoded_secs: f64,
    advanced_at: Instant,
}

impl StallWatch {
    fn new(now: Instant) -> Self {
        Self {
            encoded_secs: 0.0,
            advanced_at: now,
        }
    }

    /// Returns how long output has been stuck once that reaches
    /// [`STALL_LIMIT`], then restarts the window so the warning repeats at
    /// most once per limit.
    fn observe(&mut self, encoded_secs: f64, now: Instant) -> Option<Duration> {
        if encoded_secs > self.encoded_secs {
            self.encoded_secs = encoded_secs;
            self.advanced_at = now;
            return None;
        }
        let stuck = now.saturating_duration_since(self.advanced_at);
        if stuck < STALL_LIMIT {
            return None;
        }
        self.advanced_at = now;
        Some(stuck)
    }
}

fn progress_report(encoded_secs: f64, expected_secs: f64, elapsed_secs: f64) -> RenderProgress {
    let fraction = if expected_secs > 0.0 {
        (encoded_secs / expected_secs).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let eta_secs = if fraction > 0.0 {
        (elapsed_secs * (1.0 - fraction) / fraction).max(0.0)
    } else {
        0.0
    };

    RenderProgress {
        progress: fraction,
        eta_secs,
        stage: RenderStage::Encoding,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_lines() {
        assert_eq!(
            ProgressLine::parse("out_time_us=4500000"),
            Some(ProgressLine::OutTime(4.5))
        );
        assert_eq!(
            ProgressLine::parse("out_time_ms=2000000"),
            Some(ProgressLine::OutTime(2.0))
        );
        assert_eq!(
            ProgressLine::parse("progress=continue"),
            Some(ProgressLine::BlockEnd { finished: false })
        );
        assert_eq!(
            ProgressLine::parse("progress=end"),
            Some(ProgressLine::BlockEnd { finished: true })
        );
        assert_eq!(ProgressLine::parse("out_time_us=N/A"), None);
        assert_eq!(ProgressLine::parse("fps=29.97"), None);
        assert_eq!(ProgressLine::parse("frame"), None);
    }

    #[test]
    fn test_stall_watch() {
        let t0 = Instant::now();
        let mut watch = StallWatch::new(t0);
        assert_eq!(watch.observe(1.0, t0 + Duration::from_secs(1)), None);
        assert_eq!(watch.observe(1.0, t0 + Duration::from_secs(9)), None);
        assert_eq!(
            watch.observe(1.0, t0 + Duration::from_secs(12)),
            Some(Duration::from_secs(11))
        );
        // The window restarts after a warning.
        assert_eq!(watch.observe(1.0, t0 + Duration::from_secs(15)), None);
        assert_eq!(watch.observe(2.0, t0 + Duration::from_secs(30)), None);
        assert_eq!(watch.observe(2.0, t0 + Duration::from_secs(35)), None);
    }

    #[test]
    fn test_progress_report_clamps_and_estimates() {
        let report = progress_report(5.0, 10.0, 2.0);
        assert!((report.progress - 0.5).abs() < 1e-9);
        assert!((report.eta_secs - 2.0).abs() < 1e-9);
        assert_eq!(report.stage, RenderStage::Encoding);
        assert_eq!(progress_report(30.0, 10.0, 1.0).progress, 1.0);
    }

    #[test]
    fn test_progress_report_zero_expected_duration() {
        let report = progress_report(4.0, 0.0, 3.0);
        assert_eq!(report.progress, 0.0);
        assert_eq!(report.eta_secs, 0.0);
    }

    #[test]
    fn test_parse_probe_duration() {
        assert_eq!(parse_probe_duration("12.480000\n"), Some(12.48));
        assert_eq!(parse_probe_duration("N/A\n"), None);
        assert_eq!(parse_probe_duration("0.000\n"), None);
    }

    #[test]
    fn test_command_exists_for_missing_binary() {
        assert!(!command_exists("promoreel-definitely-not-a-binary"));
        assert!(!command_exists("/nonexistent/bin/ffmpeg"));
    }

    #[test]
    fn test_encoder_output_success() {
        let ok = EncoderOutput {
            exit_code: Some(0),
            ..Default::default()
        };
        assert!(ok.success());
        assert!(!EncoderOutput::default().success());
    }
}
