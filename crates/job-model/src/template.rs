//! Style templates.
//!
//! Each template bundles a tempo, a color grade, a transition, and a
//! background track. The registry is built once and passed explicitly to
//! the stages that need it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Template used when a job names an unknown id.
pub const DEFAULT_TEMPLATE_ID: &str = "luxury";

/// Crossfade style between consecutive scenes.
///
/// Only `fade` is offered. Other crossfade styles proved unstable on the
/// target encoder version and were removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    #[default]
    Fade,
}

impl Transition {
    pub fn as_str(self) -> &'static str {
        match self {
            Transition::Fade => "fade",
        }
    }
}

/// Immutable style bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleTemplate {
    pub id: String,

    /// Tempo of the background track in beats per minute.
    pub bpm: f64,

    /// Encoder filter expression applied to every scene.
    pub color_grade: String,

    pub transition: Transition,

    /// Background track file name, relative to the music directory.
    pub background_track: String,
}

impl StyleTemplate {
    fn new(id: &str, bpm: f64, color_grade: &str, background_track: &str) -> Self {
        Self {
            id: id.to_string(),
            bpm,
            color_grade: color_grade.to_string(),
            transition: Transition::Fade,
            background_track: background_track.to_string(),
        }
    }
}

/// Immutable map from template id to template.
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, StyleTemplate>,
    default_id: String,
}

impl TemplateRegistry {
    /// The built-in template library.
    pub fn builtin() -> Self {
        let templates = [
            StyleTemplate::new(
                "luxury",
                80.0,
                "eq=contrast=1.1:saturation=1.2,curves=vintage",
                "luxury_ambient.mp3",
            ),
            StyleTemplate::new(
                "party",
                120.0,
                "eq=contrast=1.2:saturation=1.4",
                "upbeat_pop.mp3",
            ),
            StyleTemplate::new("family", 100.0, "eq=saturation=1.3", "happy_acoustic.mp3"),
            StyleTemplate::new(
                "reels",
                128.0,
                "eq=contrast=1.1:brightness=0.05",
                "viral_beat.mp3",
            ),
        ];

        Self {
            templates: templates.into_iter().map(|t| (t.id.clone(), t)).collect(),
            default_id: DEFAULT_TEMPLATE_ID.to_string(),
        }
    }

    /// Build a registry from an explicit template list.
    ///
    /// Returns `None` when `default_id` is not among the templates.
    pub fn from_templates(
        templates: impl IntoIterator<Item = StyleTemplate>,
        default_id: &str,
    ) -> Option<Self> {
        let templates: BTreeMap<String, StyleTemplate> = templates
            .into_iter()
            .map(|t| (t.id.clone(), t))
            .collect();
        if !templates.contains_key(default_id) {
            return None;
        }
        Some(Self {
            templates,
            default_id: default_id.to_string(),
        })
    }

    /// Look up a template, substituting the default for unknown ids.
    pub fn resolve(&self, id: &str) -> &StyleTemplate {
        match self.templates.get(id) {
            Some(template) => template,
            None => {
                tracing::warn!(
                    template_id = id,
                    fallback = %self.default_id,
                    "Unknown template id, substituting default"
                );
                self.default_template()
            }
        }
    }

    /// Strict lookup.
    pub fn get(&self, id: &str) -> Option<&StyleTemplate> {
        self.templates.get(id)
    }

    pub fn default_template(&self) -> &StyleTemplate {
        &self.templates[&self.default_id]
    }

    pub fn iter(&self) -> impl Iterator<Item = &StyleTemplate> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
