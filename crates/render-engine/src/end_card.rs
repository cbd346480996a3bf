//! End card composer.
//!
//! The outro reuses the last scene's source: blurred, darkened, held for a
//! fixed duration, with the title, subtitle, optional location and the
//! call to action on top. It is concatenated after the main timeline.

use promoreel_job_model::FrameSize;
use serde::{Deserialize, Serialize};

use crate::assets::{AssetRole, MediaAsset};
use crate::graph::{Filter, FilterChain, FilterGraph, InputSource, Pad};
use crate::scene_graph::{cover_filters, fmt_secs};
use crate::text::sanitize_overlay_text;

/// Label of the end card stream.
pub const END_CARD_LABEL: &str = "vEnd";

/// Label of main timeline plus end card.
pub const FULL_LABEL: &str = "vFull";

const BLUR_SIGMA: u32 = 30;
const DIM_COLOR: &str = "black@0.55";

/// Text lines drawn on the end card, already sanitized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndCard {
    pub source: MediaAsset,
    pub duration_secs: f64,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub location: Option<String>,
    pub call_to_action: String,
}

impl EndCard {
    pub fn new(
        last_scene: &MediaAsset,
        duration_secs: f64,
        title: Option<&str>,
        subtitle: Option<&str>,
        location: Option<&str>,
        call_to_action: &str,
    ) -> Self {
        Self {
            source: last_scene.with_role(AssetRole::EndCardSource),
            duration_secs,
            title: title.map(sanitize_overlay_text),
            subtitle: subtitle.map(sanitize_overlay_text),
            location: location.map(sanitize_overlay_text),
            call_to_action: sanitize_overlay_text(call_to_action),
        }
    }

    /// Text overlays as `(text, font size, y expression)`, top to bottom.
    fn lines(&self) -> Vec<(&str, u32, &'static str, bool)> {
        let mut lines = vec![];
        if let Some(title) = &self.title {
            lines.push((title.as_str(), 72, "h*0.34", true));
        }
        if let Some(subtitle) = &self.subtitle {
            lines.push((subtitle.as_str(), 44, "h*0.34+110", false));
        }
        if let Some(location) = &self.location {
            lines.push((location.as_str(), 36, "h*0.34+175", false));
        }
        lines.push((self.call_to_action.as_str(), 40, "h*0.72", false));
        lines
    }
}

/// Append the end card chain and the concat onto `main`.
///
/// Returns the label of the combined stream.
pub fn build_end_card(
    graph: &mut FilterGraph,
    card: &EndCard,
    main: Pad,
    frame: FrameSize,
    fps: u32,
) -> Pad {
    let input = graph.add_input(InputSource::Image {
        path: card.source.path.clone(),
    });
    let hold = fmt_secs(card.duration_secs);

    let mut filters = cover_filters(frame);
    filters.push(Filter::new("gblur").named("sigma", BLUR_SIGMA));
    filters.push(
        Filter::new("drawbox")
            .named("x", 0)
            .named("y", 0)
            .named("w", "iw")
            .named("h", "ih")
            .named("color", DIM_COLOR)
            .named("t", "fill"),
    );
    filters.push(
        Filter::new("tpad")
            .named("stop_mode", "clone")
            .named("stop_duration", &hold),
    );
    filters.push(Filter::new("fps").arg(fps));
    filters.push(Filter::new("trim").named("duration", &hold));
    filters.push(Filter::new("setpts").arg("PTS-STARTPTS"));

    for (text, size, y, shadow) in card.lines() {
        let mut draw = Filter::new("drawtext")
            .named("text", text)
            .named("expansion", "none")
            .named("fontcolor", "white")
            .named("fontsize", size)
            .named("x", "(w-text_w)/2")
            .named("y", y);
        if shadow {
            draw = draw
                .named("shadowcolor", "black@0.7")
                .named("shadowx", 4)
                .named("shadowy", 4);
        }
        filters.push(draw);
    }
    filters.push(Filter::new("format").arg("yuv420p"));

    graph.push(FilterChain::new(
        vec![Pad::video(input)],
        filters,
        Pad::label(END_CARD_LABEL),
    ));

    graph.push(FilterChain::new(
        vec![main, Pad::label(END_CARD_LABEL)],
        vec![Filter::new("concat")
            .named("n", 2)
            .named("v", 1)
            .named("a", 0)],
        Pad::label(FULL_LABEL),
    ));

    Pad::label(FULL_LABEL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene_graph::MAIN_LABEL;
    use promoreel_job_model::AspectRatio;

    fn card(title: Option<&str>, location: Option<&str>) -> EndCard {
        EndCard::new(
            &MediaAsset::scene("/m/last.jpg", 4),
            4.0,
            title,
            Some("Ocean views"),
            location,
            "Book your stay today",
        )
    }

    #[test]
    fn test_end_card_uses_last_source() {
        let card = card(Some("Villa"), None);
        assert_eq!(card.source.role, AssetRole::EndCardSource);
        assert_eq!(card.source.path, "/m/last.jpg");
    }

    #[test]
    fn test_end_card_chain() {
        let mut graph = FilterGraph::new();
        let out = build_end_card(
            &mut graph,
            &card(Some("Joe's: Villa"), Some("Goa")),
            Pad::label(MAIN_LABEL),
            AspectRatio::Vertical.frame_size(),
            30,
        );
        assert_eq!(out, Pad::label(FULL_LABEL));

        let end = graph.producer(END_CARD_LABEL).unwrap();
        assert_eq!(end.find("tpad").unwrap().get("stop_duration"), Some("4"));
        assert_eq!(end.find("trim").unwrap().get("duration"), Some("4"));
        assert_eq!(end.find("gblur").unwrap().get("sigma"), Some("30"));

        let texts: Vec<_> = end
            .filters
            .iter()
            .filter(|f| f.name == "drawtext")
            .map(|f| f.get("text").unwrap().to_string())
            .collect();
        assert_eq!(
            texts,
            vec![
                "Joe’s\\: Villa".to_string(),
                "Ocean views".to_string(),
                "Goa".to_string(),
                "Book your stay today".to_string()
            ]
        );

        let concat = graph.producer(FULL_LABEL).unwrap();
        assert_eq!(
            concat.inputs,
            vec![Pad::label(MAIN_LABEL), Pad::label(END_CARD_LABEL)]
        );
        assert_eq!(concat.find("concat").unwrap().get("a"), Some("0"));
    }

    #[test]
    fn test_drawtext_disables_expansion() {
        let mut graph = FilterGraph::new();
        build_end_card(
            &mut graph,
            &card(Some("20% off"), Some("100% beachfront")),
            Pad::label(MAIN_LABEL),
            AspectRatio::Vertical.frame_size(),
            30,
        );
        let end = graph.producer(END_CARD_LABEL).unwrap();
        let draws: Vec<_> = end.filters.iter().filter(|f| f.name == "drawtext").collect();
        assert_eq!(draws.len(), 4);
        assert!(draws.iter().all(|f| f.get("expansion") == Some("none")));
        assert_eq!(draws[0].get("text"), Some("20% off"));
    }

    #[test]
    fn test_end_card_without_title_still_has_cta() {
        let mut graph = FilterGraph::new();
        build_end_card(
            &mut graph,
            &card(None, None),
            Pad::label(MAIN_LABEL),
            AspectRatio::Square.frame_size(),
            30,
        );
        let end = graph.producer(END_CARD_LABEL).unwrap();
        let draws = end.filters.iter().filter(|f| f.name == "drawtext").count();
        assert_eq!(draws, 2);
        assert_eq!(end.find("crop").unwrap().args.len(), 2);
    }
}
