//! Scene graph builder.
//!
//! Each source is scaled to cover the frame, center-cropped, graded and
//! given a pan/zoom. Scenes are then chained pairwise with crossfades and
//! the merged stream is trimmed to the main timeline length.

use promoreel_job_model::{FrameSize, StyleTemplate};
use serde::{Deserialize, Serialize};

use crate::assets::MediaAsset;
use crate::graph::{Filter, FilterChain, FilterGraph, InputSource, Pad};
use crate::timing::TimingPlan;

/// Label of the crossfaded scene chain.
pub const MERGED_LABEL: &str = "vMerged";

/// Label of the trimmed main timeline.
pub const MAIN_LABEL: &str = "vMain";

/// Ken-Burns direction. Even scenes zoom in, odd scenes zoom out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoomDirection {
    In,
    Out,
}

impl ZoomDirection {
    pub fn for_index(index: usize) -> Self {
        if index % 2 == 0 {
            ZoomDirection::In
        } else {
            ZoomDirection::Out
        }
    }

    /// Zoom factor expression per output frame.
    pub fn expression(self) -> &'static str {
        match self {
            ZoomDirection::In => "min(zoom+0.0015,1.5)",
            ZoomDirection::Out => "max(1.5-0.0015*on,1.0)",
        }
    }
}

/// One segment of the main timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub index: usize,
    pub source: MediaAsset,
    pub duration_secs: f64,
    pub zoom: ZoomDirection,
    /// Where the crossfade into this scene starts. Zero for the first scene.
    pub transition_offset_secs: f64,
}

/// Assign timing and zoom direction to each source.
pub fn plan_scenes(assets: &[MediaAsset], timing: &TimingPlan) -> Vec<Scene> {
    assets
        .iter()
        .enumerate()
        .map(|(index, source)| Scene {
            index,
            source: source.clone(),
            duration_secs: timing.per_scene_secs,
            zoom: ZoomDirection::for_index(index),
            transition_offset_secs: timing.offset_of(index),
        })
        .collect()
}

/// Scale to cover the frame, center-crop, and square the pixels.
pub fn cover_filters(frame: FrameSize) -> Vec<Filter> {
    vec![
        Filter::new("scale")
            .arg(frame.width)
            .arg(frame.height)
            .named("force_original_aspect_ratio", "increase"),
        Filter::new("crop").arg(frame.width).arg(frame.height),
        Filter::new("setsar").arg(1),
    ]
}

/// Append per-scene chains, crossfades and the main-timeline trim.
///
/// Returns the label of the main timeline.
pub fn build_scene_graph(
    graph: &mut FilterGraph,
    scenes: &[Scene],
    template: &StyleTemplate,
    timing: &TimingPlan,
    frame: FrameSize,
    fps: u32,
) -> Pad {
    let grade = Filter::parse_chain(&template.color_grade);
    let frames = timing.zoompan_frames(fps);
    let single = scenes.len() == 1;

    for scene in scenes {
        let input = graph.add_input(InputSource::LoopedImage {
            path: scene.source.path.clone(),
            hold_secs: timing.held_secs(),
        });

        let mut filters = cover_filters(frame);
        filters.extend(grade.iter().cloned());
        filters.push(
            Filter::new("zoompan")
                .named("z", scene.zoom.expression())
                .named("d", frames)
                .named("x", "iw/2-(iw/zoom/2)")
                .named("y", "ih/2-(ih/zoom/2)")
                .named("s", format!("{}x{}", frame.width, frame.height))
                .named("fps", fps),
        );

        let output = if single {
            Pad::label(MERGED_LABEL)
        } else {
            Pad::label(format!("v{}", scene.index))
        };
        graph.push(FilterChain::new(vec![Pad::video(input)], filters, output));
    }

    let mut previous = Pad::label("v0");
    for scene in scenes.iter().skip(1) {
        let output = if scene.index == scenes.len() - 1 {
            Pad::label(MERGED_LABEL)
        } else {
            Pad::label(format!("vtmp{}", scene.index))
        };
        graph.push(FilterChain::new(
            vec![previous, Pad::label(format!("v{}", scene.index))],
            vec![Filter::new("xfade")
                .named("transition", template.transition.as_str())
                .named("duration", fmt_secs(timing.transition_secs))
                .named("offset", fmt_secs(scene.transition_offset_secs))],
            output.clone(),
        ));
        previous = output;
    }

    graph.push(FilterChain::new(
        vec![Pad::label(MERGED_LABEL)],
        vec![
            Filter::new("trim").named("duration", fmt_secs(timing.main_secs())),
            Filter::new("setpts").arg("PTS-STARTPTS"),
            Filter::new("format").arg("yuv420p"),
        ],
        Pad::label(MAIN_LABEL),
    ));

    tracing::debug!(
        scenes = scenes.len(),
        zoom_frames = frames,
        main_secs = timing.main_secs(),
        "Scene graph built"
    );

    Pad::label(MAIN_LABEL)
}

/// Seconds with trailing zeros dropped (`3`, `2.5`, `0.333333`).
pub fn fmt_secs(secs: f64) -> String {
    let formatted = format!("{secs:.6}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promoreel_job_model::{AspectRatio, TemplateRegistry};

    fn build(n: usize) -> (FilterGraph, Vec<Scene>) {
        let registry = TemplateRegistry::builtin();
        let template = registry.resolve("luxury");
        let timing = TimingPlan::compute(template, n, None);
        let assets: Vec<_> = (0..n)
            .map(|i| MediaAsset::scene(format!("/m/{i}.jpg"), i))
            .collect();
        let scenes = plan_scenes(&assets, &timing);
        let mut graph = FilterGraph::new();
        build_scene_graph(
            &mut graph,
            &scenes,
            template,
            &timing,
            AspectRatio::Vertical.frame_size(),
            30,
        );
        (graph, scenes)
    }

    #[test]
    fn test_zoom_alternates() {
        let (_, scenes) = build(4);
        let zooms: Vec<_> = scenes.iter().map(|s| s.zoom).collect();
        assert_eq!(
            zooms,
            vec![
                ZoomDirection::In,
                ZoomDirection::Out,
                ZoomDirection::In,
                ZoomDirection::Out
            ]
        );
    }

    #[test]
    fn test_xfade_offsets_are_cumulative() {
        let (graph, _) = build(4);
        let offsets: Vec<_> = graph
            .chains
            .iter()
            .filter_map(|c| c.find("xfade"))
            .map(|f| f.get("offset").unwrap().to_string())
            .collect();
        assert_eq!(offsets, vec!["3", "6", "9"]);
        assert!(graph.producer("vtmp1").is_some());
        assert!(graph.producer("vtmp2").is_some());
        assert!(graph.producer(MERGED_LABEL).unwrap().find("xfade").is_some());
        assert!(graph.reused_labels().is_empty());
    }

    #[test]
    fn test_single_scene_skips_chaining() {
        let (graph, _) = build(1);
        assert!(graph.chains.iter().all(|c| c.find("xfade").is_none()));
        let merged = graph.producer(MERGED_LABEL).unwrap();
        assert!(merged.find("zoompan").is_some());
    }

    #[test]
    fn test_scene_chain_contents() {
        let (graph, _) = build(2);
        let first = &graph.chains[0];
        let names: Vec<_> = first.filters.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["scale", "crop", "setsar", "eq", "curves", "zoompan"]
        );
        let zoom = first.find("zoompan").unwrap();
        assert_eq!(zoom.get("d"), Some("130"));
        assert_eq!(zoom.get("s"), Some("720x1280"));
        assert_eq!(
            graph.inputs[0],
            InputSource::LoopedImage {
                path: "/m/0.jpg".into(),
                hold_secs: 4.0
            }
        );
    }

    #[test]
    fn test_main_trim_matches_timeline() {
        let (graph, _) = build(5);
        let main = graph.producer(MAIN_LABEL).unwrap();
        assert_eq!(main.find("trim").unwrap().get("duration"), Some("15"));
    }

    #[test]
    fn test_fmt_secs() {
        assert_eq!(fmt_secs(3.0), "3");
        assert_eq!(fmt_secs(2.5), "2.5");
        assert_eq!(fmt_secs(0.0), "0");
        assert_eq!(fmt_secs(1.0 / 3.0), "0.333333");
    }
}
