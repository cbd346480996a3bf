//! Branding overlays: logo watermark and persistent caption.

use serde::{Deserialize, Serialize};

use crate::assets::MediaAsset;
use crate::graph::{Filter, FilterChain, FilterGraph, InputSource, Pad};
use crate::text::sanitize_overlay_text;

/// Label of the final video stream.
pub const VIDEO_OUT_LABEL: &str = "vOut";

/// Logo width in pixels; height follows the aspect ratio.
pub const LOGO_WIDTH: u32 = 180;

/// Logo offset from the top-left corner.
pub const LOGO_MARGIN: u32 = 20;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrandingPlan {
    pub logo: Option<MediaAsset>,
    /// Sanitized caption shown for the whole video.
    pub caption: Option<String>,
}

impl BrandingPlan {
    pub fn new(logo: Option<MediaAsset>, title: Option<&str>) -> Self {
        Self {
            logo,
            caption: title.map(sanitize_overlay_text).filter(|t| !t.is_empty()),
        }
    }
}

/// Append logo and caption overlays over `video`. The caption goes last so
/// it sits above the logo. Returns the final video label.
pub fn build_branding(graph: &mut FilterGraph, plan: &BrandingPlan, video: Pad) -> Pad {
    let mut current = video;

    if let Some(logo) = &plan.logo {
        let input = graph.add_input(InputSource::Image {
            path: logo.path.clone(),
        });
        graph.push(FilterChain::new(
            vec![Pad::video(input)],
            vec![Filter::new("scale").arg(LOGO_WIDTH).arg(-1)],
            Pad::label("vLogo"),
        ));

        let output = if plan.caption.is_some() {
            Pad::label("vBranded")
        } else {
            Pad::label(VIDEO_OUT_LABEL)
        };
        graph.push(FilterChain::new(
            vec![current, Pad::label("vLogo")],
            vec![Filter::new("overlay").arg(LOGO_MARGIN).arg(LOGO_MARGIN)],
            output.clone(),
        ));
        current = output;
    }

    let final_filter = match &plan.caption {
        Some(caption) => Filter::new("drawtext")
            .named("text", caption)
            .named("expansion", "none")
            .named("fontcolor", "white")
            .named("fontsize", 36)
            .named("box", 1)
            .named("boxcolor", "black@0.5")
            .named("boxborderw", 14)
            .named("x", "(w-text_w)/2")
            .named("y", "h-text_h-90"),
        None if current.name() == Some(VIDEO_OUT_LABEL) => return current,
        None => Filter::new("null"),
    };

    graph.push(FilterChain::new(
        vec![current],
        vec![final_filter],
        Pad::label(VIDEO_OUT_LABEL),
    ));
    Pad::label(VIDEO_OUT_LABEL)
}
