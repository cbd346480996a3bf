//! Render plan emitter.
//!
//! Serializes a [`RenderPlan`] into encoder arguments, runs the encoder,
//! verifies the output file and samples a poster thumbnail. Without an
//! encoder on the host it writes a placeholder instead (simulation mode).

use std::path::{Path, PathBuf};

use promoreel_common::config::RenderDefaults;
use promoreel_common::error::{ReelError, ReelResult};

use crate::encoder::{EncoderBackend, ProgressCallback, RenderProgress, RenderStage};
use crate::graph::{Filter, FilterArg, FilterChain, FilterGraph, InputSource, Pad, StreamKind};
use crate::plan::RenderPlan;
use crate::scene_graph::fmt_secs;

/// Contents of the simulation-mode placeholder file.
pub const PLACEHOLDER_CONTENT: &[u8] = b"PROMOREEL SIMULATED RENDER\n";

/// Time offset of the poster frame.
const THUMBNAIL_AT_SECS: f64 = 1.0;

/// Stderr lines kept in encoder error messages.
const STDERR_TAIL_LINES: usize = 20;

/// What an emit produced.
#[derive(Debug, Clone, PartialEq)]
pub struct EmitOutcome {
    pub output_path: PathBuf,
    pub thumbnail_path: Option<PathBuf>,
    /// Set when no encoder was available and a placeholder was written.
    pub simulated: bool,
}

/// Serialize a filter graph into `-filter_complex` syntax.
pub fn serialize_filter_graph(graph: &FilterGraph) -> String {
    graph
        .chains
        .iter()
        .map(serialize_chain)
        .collect::<Vec<_>>()
        .join(";")
}

fn serialize_chain(chain: &FilterChain) -> String {
    let inputs: String = chain.inputs.iter().map(serialize_pad).collect();
    let filters = chain
        .filters
        .iter()
        .map(serialize_filter)
        .collect::<Vec<_>>()
        .join(",");
    format!("{inputs}{filters}{}", serialize_pad(&chain.output))
}

fn serialize_pad(pad: &Pad) -> String {
    match pad {
        Pad::Input { index, stream } => {
            let kind = match stream {
                StreamKind::Video => "v",
                StreamKind::Audio => "a",
            };
            format!("[{index}:{kind}]")
        }
        Pad::Label(name) => format!("[{name}]"),
    }
}

fn serialize_filter(filter: &Filter) -> String {
    if filter.args.is_empty() {
        return filter.name.clone();
    }
    let args = filter
        .args
        .iter()
        .map(|arg| match arg {
            FilterArg::Positional(value) => quote_value(value),
            FilterArg::Named(key, value) => format!("{key}={}", quote_value(value)),
        })
        .collect::<Vec<_>>()
        .join(":");
    format!("{}={args}", filter.name)
}

/// Single-quote values containing graph delimiters.
fn quote_value(value: &str) -> String {
    const DELIMITERS: &[char] = &[',', ';', '[', ']', ':', '\'', ' ', '='];
    if !value.contains(DELIMITERS) {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', "'\\''"))
}

fn input_args(source: &InputSource) -> Vec<String> {
    match source {
        InputSource::LoopedImage { path, hold_secs } => vec![
            "-loop".to_string(),
            "1".to_string(),
            "-t".to_string(),
            fmt_secs(*hold_secs),
            "-i".to_string(),
            path.clone(),
        ],
        InputSource::Image { path } | InputSource::Media { path } => {
            vec!["-i".to_string(), path.clone()]
        }
        InputSource::SilentAudio {
            duration_secs,
            sample_rate,
        } => vec![
            "-f".to_string(),
            "lavfi".to_string(),
            "-t".to_string(),
            fmt_secs(*duration_secs),
            "-i".to_string(),
            format!("anullsrc=r={sample_rate}:cl=stereo"),
        ],
    }
}

fn codec_args(render: &RenderDefaults) -> Vec<String> {
    let video_bitrate = format!("{}k", render.video_bitrate_kbps.max(1000));
    let audio_bitrate = format!("{}k", render.audio_bitrate_kbps.max(64));
    vec![
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        "medium".to_string(),
        "-profile:v".to_string(),
        "high".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-b:v".to_string(),
        video_bitrate,
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        audio_bitrate,
        "-movflags".to_string(),
        "+faststart".to_string(),
    ]
}

/// Full encoder argument list for a plan.
pub fn encoder_args(plan: &RenderPlan, output: &Path, render: &RenderDefaults) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-nostats".to_string(),
        "-progress".to_string(),
        "pipe:1".to_string(),
    ];

    for source in &plan.graph.inputs {
        args.extend(input_args(source));
    }

    args.push("-filter_complex".to_string());
    args.push(serialize_filter_graph(&plan.graph));
    args.push("-map".to_string());
    args.push(serialize_pad(&plan.video_out));
    args.push("-map".to_string());
    args.push(serialize_pad(&plan.audio_out));
    args.push("-r".to_string());
    args.push(plan.fps.to_string());
    args.push("-t".to_string());
    args.push(fmt_secs(plan.total_duration_secs));
    args.extend(codec_args(render));
    args.push(output.display().to_string());
    args
}

/// Arguments sampling one poster frame from a rendered video.
pub fn thumbnail_args(video: &Path, thumbnail: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-ss".to_string(),
        fmt_secs(THUMBNAIL_AT_SECS),
        "-i".to_string(),
        video.display().to_string(),
        "-frames:v".to_string(),
        "1".to_string(),
        "-q:v".to_string(),
        "2".to_string(),
        thumbnail.display().to_string(),
    ]
}

/// Plain-text summary written next to the output.
pub fn debug_report(plan: &RenderPlan, args: &[String]) -> String {
    format!(
        "job_id={}\naspect={}\ntemplate={}\nscenes={}\nper_scene_secs={:.3}\n\
         timing_source={:?}\ntransition_secs={:.3}\nend_card_secs={:.3}\ntotal_secs={:.3}\n\
         audio_strategy={:?}\nbackground={:?}\ninputs={}\nchains={}\nencoder_args={}\n",
        plan.job_id,
        plan.aspect.label(),
        plan.template_id,
        plan.scenes.len(),
        plan.timing.per_scene_secs,
        plan.timing.source,
        plan.timing.transition_secs,
        plan.end_card.duration_secs,
        plan.total_duration_secs,
        plan.audio.strategy,
        plan.audio.background,
        plan.graph.inputs.len(),
        plan.graph.chains.len(),
        args.join(" "),
    )
}

/// Drives one plan through the encoder.
pub struct Emitter<'a> {
    encoder: &'a dyn EncoderBackend,
    render: &'a RenderDefaults,
}

impl<'a> Emitter<'a> {
    pub fn new(encoder: &'a dyn EncoderBackend, render: &'a RenderDefaults) -> Self {
        Self { encoder, render }
    }

    /// Render `plan` to `output`.
    pub fn emit(
        &self,
        plan: &RenderPlan,
        output: &Path,
        progress: Option<&ProgressCallback>,
    ) -> ReelResult<EmitOutcome> {
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let args = encoder_args(plan, output, self.render);
        let debug_path = output.with_extension("ffmpeg-debug.txt");
        if let Err(err) = std::fs::write(&debug_path, debug_report(plan, &args)) {
            tracing::warn!(
                error = %err,
                path = %debug_path.display(),
                "Failed to write ffmpeg debug report"
            );
        } else {
            tracing::info!(path = %debug_path.display(), "Wrote ffmpeg debug report");
        }

        if !self.encoder.is_available() {
            tracing::warn!(
                encoder = self.encoder.name(),
                output = %output.display(),
                "Encoder not found, writing simulated output"
            );
            std::fs::write(output, PLACEHOLDER_CONTENT)?;
            return Ok(EmitOutcome {
                output_path: output.to_path_buf(),
                thumbnail_path: None,
                simulated: true,
            });
        }

        if let Some(cb) = progress {
            cb(RenderProgress::at(RenderStage::Encoding, 0.0));
        }

        let result = self
            .encoder
            .run(&args, plan.total_duration_secs, progress)?;
        if !result.success() {
            return Err(ReelError::encoder(format!(
                "{} exited with status {}: {}",
                self.encoder.name(),
                result
                    .exit_code
                    .map_or_else(|| "signal".to_string(), |code| code.to_string()),
                stderr_tail(&result.stderr)
            )));
        }
        if !output.exists() {
            return Err(ReelError::encoder(format!(
                "{} reported success but {} was not written",
                self.encoder.name(),
                output.display()
            )));
        }

        if let Some(cb) = progress {
            cb(RenderProgress::at(RenderStage::Thumbnail, 1.0));
        }
        let thumbnail_path = self.thumbnail(output);

        tracing::info!(
            job_id = %plan.job_id,
            output = %output.display(),
            total_secs = plan.total_duration_secs,
            thumbnail = thumbnail_path.is_some(),
            "Render written"
        );

        Ok(EmitOutcome {
            output_path: output.to_path_buf(),
            thumbnail_path,
            simulated: false,
        })
    }

    /// Poster frame next to the video. Failures only warn.
    fn thumbnail(&self, video: &Path) -> Option<PathBuf> {
        let thumbnail = video.with_extension("jpg");
        match self
            .encoder
            .run(&thumbnail_args(video, &thumbnail), THUMBNAIL_AT_SECS, None)
        {
            Ok(out) if out.success() && thumbnail.exists() => Some(thumbnail),
            Ok(out) => {
                tracing::warn!(
                    exit_code = ?out.exit_code,
                    stderr = %stderr_tail(&out.stderr),
                    "Thumbnail extraction failed"
                );
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, "Thumbnail extraction failed");
                None
            }
        }
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.trim().lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::FilterChain;

    #[test]
    fn test_serialize_chain() {
        let mut graph = FilterGraph::new();
        graph.push(FilterChain::new(
            vec![Pad::video(0)],
            vec![
                Filter::new("scale")
                    .arg(720)
                    .arg(1280)
                    .named("force_original_aspect_ratio", "increase"),
                Filter::new("setsar").arg(1),
                Filter::new("zoompan").named("z", "min(zoom+0.0015,1.5)"),
            ],
            Pad::label("v0"),
        ));
        graph.push(FilterChain::new(
            vec![Pad::label("v0"), Pad::audio(1)],
            vec![Filter::new("null")],
            Pad::label("out"),
        ));

        assert_eq!(
            serialize_filter_graph(&graph),
            "[0:v]scale=720:1280:force_original_aspect_ratio=increase,setsar=1,\
             zoompan=z='min(zoom+0.0015,1.5)'[v0];[v0][1:a]null[out]"
        );
    }

    #[test]
    fn test_quote_value() {
        assert_eq!(quote_value("iw/2-(iw/zoom/2)"), "iw/2-(iw/zoom/2)");
        assert_eq!(quote_value("Casa Mar"), "'Casa Mar'");
        assert_eq!(quote_value("Stay\\: now"), "'Stay\\: now'");
        assert_eq!(quote_value("a'b"), "'a'\\''b'");
    }

    #[test]
    fn test_input_args() {
        assert_eq!(
            input_args(&InputSource::LoopedImage {
                path: "/a.jpg".into(),
                hold_secs: 4.0
            }),
            vec!["-loop", "1", "-t", "4", "-i", "/a.jpg"]
        );
        assert_eq!(
            input_args(&InputSource::SilentAudio {
                duration_secs: 15.0,
                sample_rate: 44_100
            }),
            vec!["-f", "lavfi", "-t", "15", "-i", "anullsrc=r=44100:cl=stereo"]
        );
    }

    #[test]
    fn test_thumbnail_args_sample_one_second() {
        let args = thumbnail_args(Path::new("/o/v.mp4"), Path::new("/o/v.jpg"));
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        assert_eq!(args[ss + 1], "1");
        assert_eq!(args.last().unwrap(), "/o/v.jpg");
    }

    #[test]
    fn test_stderr_tail() {
        let long: String = (0..50).map(|i| format!("line {i}\n")).collect();
        let tail = stderr_tail(&long);
        assert_eq!(tail.lines().count(), STDERR_TAIL_LINES);
        assert!(tail.ends_with("line 49"));
    }
}
