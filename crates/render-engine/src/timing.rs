//! Timing planner.
//!
//! Per-scene duration comes from the template tempo, or from the voiceover
//! length when one is present. The end card and the crossfade overlap are
//! fixed constants.

use promoreel_job_model::StyleTemplate;
use serde::{Deserialize, Serialize};

/// Beats of background music covered by one scene.
pub const BEATS_PER_SCENE: f64 = 4.0;

/// Per-scene duration when the template carries no usable tempo.
pub const FALLBACK_SCENE_SECS: f64 = 3.0;

/// Shortest scene allowed when timing follows a voiceover.
pub const MIN_SCENE_SECS: f64 = 2.0;

/// Crossfade overlap between consecutive scenes.
pub const TRANSITION_SECS: f64 = 1.0;

/// Fixed length of the call-to-action outro.
pub const END_CARD_SECS: f64 = 4.0;

/// Background music fade length at both ends.
pub const AUDIO_FADE_SECS: f64 = 2.0;

/// Extra frames handed to the pan/zoom filter beyond the held duration.
pub const ZOOM_BUFFER_FRAMES: u64 = 10;

/// Where the per-scene duration came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TimingSource {
    /// `(60 / bpm) * 4`.
    Tempo { bpm: f64 },
    /// Template tempo was zero or negative.
    Flat,
    /// `max(voice / scenes, 2.0)`. `clamped` is set when the floor won.
    Voiceover { voice_secs: f64, clamped: bool },
}

/// Timing decisions for one render.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingPlan {
    pub per_scene_secs: f64,
    pub transition_secs: f64,
    pub end_card_secs: f64,
    pub scene_count: usize,
    pub source: TimingSource,
}

impl TimingPlan {
    /// Compute timing for `scene_count` scenes.
    ///
    /// `voice_secs` is the measured voiceover length; `None` or a
    /// non-positive value means tempo timing.
    pub fn compute(template: &StyleTemplate, scene_count: usize, voice_secs: Option<f64>) -> Self {
        let (per_scene_secs, source) = match voice_secs {
            Some(voice) if voice > 0.0 && scene_count > 0 => {
                let raw = voice / scene_count as f64;
                let clamped = raw < MIN_SCENE_SECS;
                if clamped {
                    // Audio ends before the main timeline; the clamp is kept as-is.
                    tracing::warn!(
                        voice_secs = voice,
                        scenes = scene_count,
                        raw_scene_secs = raw,
                        main_secs = MIN_SCENE_SECS * scene_count as f64,
                        "Voiceover shorter than scene floor allows, timeline will outlast voice"
                    );
                }
                (
                    raw.max(MIN_SCENE_SECS),
                    TimingSource::Voiceover {
                        voice_secs: voice,
                        clamped,
                    },
                )
            }
            _ => tempo_scene_secs(template.bpm),
        };

        Self {
            per_scene_secs,
            transition_secs: TRANSITION_SECS,
            end_card_secs: END_CARD_SECS,
            scene_count,
            source,
        }
    }

    /// How long each source image must be held so the crossfade has material.
    pub fn held_secs(&self) -> f64 {
        self.per_scene_secs + self.transition_secs
    }

    /// Frame count for the pan/zoom filter.
    pub fn zoompan_frames(&self, fps: u32) -> u64 {
        (self.held_secs() * fps as f64).floor() as u64 + ZOOM_BUFFER_FRAMES
    }

    /// Length of the crossfaded scene timeline.
    ///
    /// Summed scene by scene so it matches the scene list bit for bit.
    pub fn main_secs(&self) -> f64 {
        (0..self.scene_count).fold(0.0, |acc, _| acc + self.per_scene_secs)
    }

    /// Main timeline plus end card. Also the encoder's output cap.
    pub fn total_secs(&self) -> f64 {
        self.main_secs() + self.end_card_secs
    }

    /// Start of scene `index` on the main timeline, which is also the
    /// offset of the crossfade into it.
    pub fn offset_of(&self, index: usize) -> f64 {
        (0..index).fold(0.0, |acc, _| acc + self.per_scene_secs)
    }
}

fn tempo_scene_secs(bpm: f64) -> (f64, TimingSource) {
    if bpm > 0.0 {
        ((60.0 / bpm) * BEATS_PER_SCENE, TimingSource::Tempo { bpm })
    } else {
        (FALLBACK_SCENE_SECS, TimingSource::Flat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promoreel_job_model::TemplateRegistry;

    fn template(bpm: f64) -> StyleTemplate {
        let mut t = TemplateRegistry::builtin().default_template().clone();
        t.bpm = bpm;
        t
    }

    #[test]
    fn test_tempo_timing() {
        let plan = TimingPlan::compute(&template(80.0), 5, None);
        assert!((plan.per_scene_secs - 3.0).abs() < 1e-9);
        assert!((plan.total_secs() - 19.0).abs() < 1e-9);
        assert_eq!(plan.source, TimingSource::Tempo { bpm: 80.0 });
    }

    #[test]
    fn test_non_positive_bpm_uses_flat_duration() {
        for bpm in [0.0, -10.0] {
            let plan = TimingPlan::compute(&template(bpm), 4, None);
            assert_eq!(plan.per_scene_secs, FALLBACK_SCENE_SECS);
            assert_eq!(plan.source, TimingSource::Flat);
        }
    }

    #[test]
    fn test_voiceover_overrides_tempo() {
        let plan = TimingPlan::compute(&template(120.0), 3, Some(12.0));
        assert!((plan.per_scene_secs - 4.0).abs() < 1e-9);
        assert!((plan.total_secs() - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_voiceover_is_clamped() {
        let plan = TimingPlan::compute(&template(80.0), 5, Some(3.0));
        assert_eq!(plan.per_scene_secs, MIN_SCENE_SECS);
        assert!((plan.total_secs() - 14.0).abs() < 1e-9);
        assert_eq!(
            plan.source,
            TimingSource::Voiceover {
                voice_secs: 3.0,
                clamped: true
            }
        );
    }

    #[test]
    fn test_zero_voice_falls_back_to_tempo() {
        let plan = TimingPlan::compute(&template(80.0), 5, Some(0.0));
        assert!(matches!(plan.source, TimingSource::Tempo { .. }));
    }

    #[test]
    fn test_held_duration_and_frames() {
        let plan = TimingPlan::compute(&template(80.0), 2, None);
        assert!((plan.held_secs() - 4.0).abs() < 1e-9);
        assert_eq!(plan.zoompan_frames(30), 130);
        assert!((plan.offset_of(1) - 3.0).abs() < 1e-9);
    }
}
