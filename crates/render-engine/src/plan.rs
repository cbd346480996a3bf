//! Render plan composition.
//!
//! A [`RenderPlan`] is the complete description of one encoder run. It is
//! built without touching the encoder and can be inspected or serialized.

use std::path::PathBuf;

use promoreel_common::error::{ReelError, ReelResult};
use promoreel_job_model::{AspectRatio, FrameSize, RenderOptions, StyleTemplate};
use serde::{Deserialize, Serialize};

use crate::assets::MediaAsset;
use crate::audio::{build_audio, AudioPlan, Voiceover};
use crate::branding::{build_branding, BrandingPlan};
use crate::end_card::{build_end_card, EndCard};
use crate::graph::{FilterGraph, Pad};
use crate::scene_graph::{build_scene_graph, plan_scenes, Scene};
use crate::timing::TimingPlan;

/// Everything a plan is composed from.
#[derive(Debug, Clone)]
pub struct PlanInputs<'a> {
    pub job_id: &'a str,
    pub aspect: AspectRatio,
    pub template: &'a StyleTemplate,
    pub assets: &'a [MediaAsset],
    pub options: &'a RenderOptions,
    pub voiceover: Option<Voiceover>,
    pub track_path: PathBuf,
    pub logo: Option<MediaAsset>,
    pub fps: u32,
    pub call_to_action: &'a str,
}

/// One fully-timed render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderPlan {
    pub job_id: String,
    pub aspect: AspectRatio,
    pub frame: FrameSize,
    pub fps: u32,
    pub template_id: String,
    pub timing: TimingPlan,
    pub scenes: Vec<Scene>,
    pub end_card: EndCard,
    pub audio: AudioPlan,
    pub branding: BrandingPlan,
    /// Scenes plus end card. Also the encoder's output cap.
    pub total_duration_secs: f64,
    pub graph: FilterGraph,
    pub video_out: Pad,
    pub audio_out: Pad,
}

impl RenderPlan {
    /// Sum of scene durations.
    pub fn main_duration_secs(&self) -> f64 {
        self.scenes.iter().map(|s| s.duration_secs).sum()
    }
}

/// Run the timing, scene, end card, audio and branding stages in order.
pub fn compose_plan(inputs: PlanInputs<'_>) -> ReelResult<RenderPlan> {
    let last = inputs
        .assets
        .last()
        .ok_or_else(|| ReelError::asset_resolution("Cannot plan a render without scene sources"))?;

    let fps = inputs.fps.max(1);
    let frame = inputs.aspect.frame_size();
    let voice_secs = inputs.voiceover.as_ref().map(|v| v.duration_secs);
    let timing = TimingPlan::compute(inputs.template, inputs.assets.len(), voice_secs);
    let scenes = plan_scenes(inputs.assets, &timing);

    let mut graph = FilterGraph::new();
    let main = build_scene_graph(&mut graph, &scenes, inputs.template, &timing, frame, fps);

    let end_card = EndCard::new(
        last,
        timing.end_card_secs,
        inputs.options.title.as_deref(),
        inputs.options.subtitle.as_deref(),
        inputs.options.location.as_deref(),
        inputs.call_to_action,
    );
    let full = build_end_card(&mut graph, &end_card, main, frame, fps);

    let audio = AudioPlan::new(&inputs.track_path, inputs.voiceover, &timing);
    let audio_out = build_audio(&mut graph, &audio);

    let branding = BrandingPlan::new(inputs.logo, inputs.options.title.as_deref());
    let video_out = build_branding(&mut graph, &branding, full);

    let scene_secs: f64 = scenes.iter().map(|s| s.duration_secs).sum();
    let total_duration_secs = scene_secs + end_card.duration_secs;

    tracing::info!(
        job_id = inputs.job_id,
        aspect = inputs.aspect.label(),
        template = %inputs.template.id,
        scenes = scenes.len(),
        per_scene_secs = timing.per_scene_secs,
        total_secs = total_duration_secs,
        inputs = graph.inputs.len(),
        chains = graph.chains.len(),
        "Render plan composed"
    );

    Ok(RenderPlan {
        job_id: inputs.job_id.to_string(),
        aspect: inputs.aspect,
        frame,
        fps,
        template_id: inputs.template.id.clone(),
        timing,
        scenes,
        end_card,
        audio,
        branding,
        total_duration_secs,
        graph,
        video_out,
        audio_out,
    })
}
