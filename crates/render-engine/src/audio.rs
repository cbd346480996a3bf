//! Audio mixer.
//!
//! The background bed is trimmed to the total duration and faded at both
//! ends. A voiceover, when present, is boosted and mixed over a ducked bed
//! with the longest input deciding the mix length.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::graph::{Filter, FilterChain, FilterGraph, InputSource, Pad};
use crate::scene_graph::fmt_secs;
use crate::timing::{TimingPlan, AUDIO_FADE_SECS};

/// Label of the final audio stream.
pub const AUDIO_OUT_LABEL: &str = "aOut";

/// Sample rate of synthesized silence.
pub const SILENCE_SAMPLE_RATE: u32 = 44_100;

/// Gain applied to the voiceover before mixing.
pub const VOICE_GAIN: f64 = 1.5;

/// Gain applied to the background bed under a voiceover.
pub const DUCKED_MUSIC_GAIN: f64 = 0.3;

/// Where the background bed comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BackgroundSource {
    Track { path: String },
    /// Stand-in when the template's track is missing on disk.
    Silence { duration_secs: f64 },
}

/// A voiceover file and its measured length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voiceover {
    pub path: String,
    pub duration_secs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixStrategy {
    MusicOnly,
    VoicePlusMusic,
}

/// Audio decisions for one render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioPlan {
    pub background: BackgroundSource,
    pub voiceover: Option<Voiceover>,
    pub strategy: MixStrategy,
    /// Length the bed is trimmed to.
    pub total_secs: f64,
}

impl AudioPlan {
    pub fn new(track: &Path, voiceover: Option<Voiceover>, timing: &TimingPlan) -> Self {
        let background = if track.exists() {
            BackgroundSource::Track {
                path: track.display().to_string(),
            }
        } else {
            let duration_secs = timing.main_secs();
            tracing::warn!(
                track = %track.display(),
                duration_secs,
                "Background track missing, synthesizing silence"
            );
            BackgroundSource::Silence { duration_secs }
        };

        let strategy = if voiceover.is_some() {
            MixStrategy::VoicePlusMusic
        } else {
            MixStrategy::MusicOnly
        };

        Self {
            background,
            voiceover,
            strategy,
            total_secs: timing.total_secs(),
        }
    }
}

/// Append the audio chains. Returns the final audio label.
pub fn build_audio(graph: &mut FilterGraph, plan: &AudioPlan) -> Pad {
    let bed_input = match &plan.background {
        BackgroundSource::Track { path } => {
            graph.add_input(InputSource::Media { path: path.clone() })
        }
        BackgroundSource::Silence { duration_secs } => graph.add_input(InputSource::SilentAudio {
            duration_secs: *duration_secs,
            sample_rate: SILENCE_SAMPLE_RATE,
        }),
    };

    let total = plan.total_secs;
    let fade_out_start = (total - AUDIO_FADE_SECS).max(0.0);
    let mut bed = vec![
        Filter::new("atrim").named("duration", fmt_secs(total)),
        Filter::new("asetpts").arg("PTS-STARTPTS"),
        Filter::new("afade")
            .named("t", "in")
            .named("st", 0)
            .named("d", fmt_secs(AUDIO_FADE_SECS)),
        Filter::new("afade")
            .named("t", "out")
            .named("st", fmt_secs(fade_out_start))
            .named("d", fmt_secs(AUDIO_FADE_SECS)),
    ];

    let Some(voice) = &plan.voiceover else {
        graph.push(FilterChain::new(
            vec![Pad::audio(bed_input)],
            bed,
            Pad::label(AUDIO_OUT_LABEL),
        ));
        return Pad::label(AUDIO_OUT_LABEL);
    };

    bed.push(Filter::new("volume").arg(DUCKED_MUSIC_GAIN));
    graph.push(FilterChain::new(
        vec![Pad::audio(bed_input)],
        bed,
        Pad::label("aBg"),
    ));

    let voice_input = graph.add_input(InputSource::Media {
        path: voice.path.clone(),
    });
    graph.push(FilterChain::new(
        vec![Pad::audio(voice_input)],
        vec![Filter::new("volume").arg(VOICE_GAIN)],
        Pad::label("aVoice"),
    ));

    graph.push(FilterChain::new(
        vec![Pad::label("aBg"), Pad::label("aVoice")],
        vec![Filter::new("amix")
            .named("inputs", 2)
            .named("duration", "longest")
            .named("dropout_transition", 2)],
        Pad::label(AUDIO_OUT_LABEL),
    ));

    Pad::label(AUDIO_OUT_LABEL)
}
