//! Asset resolution.
//!
//! Turns job options into an ordered, capped list of scene sources.
//! Precedence: media ids, then raw paths, then synthetic theme images.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use promoreel_common::config::AppConfig;
use promoreel_common::error::{ReelError, ReelResult};
use promoreel_job_model::RenderOptions;
use serde::{Deserialize, Serialize};

use crate::encoder::EncoderBackend;
use crate::text::sanitize_overlay_text;

/// Hard upper bound on scenes per render.
pub const MAX_ASSETS: usize = 15;

/// Colors cycled across synthetic fallback images.
pub const FALLBACK_PALETTE: [&str; 3] = ["0x1B2A41", "0x8C5E58", "0x2E6F6B"];

/// Theme used for synthetic images when the job names none.
pub const DEFAULT_THEME: &str = "property";

/// What a resolved asset is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetRole {
    SceneSource,
    Logo,
    EndCardSource,
}

/// A resolved media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAsset {
    /// Absolute path or remote URL.
    pub path: String,
    pub position: usize,
    pub role: AssetRole,
}

impl MediaAsset {
    pub fn scene(path: impl Into<String>, position: usize) -> Self {
        Self {
            path: path.into(),
            position,
            role: AssetRole::SceneSource,
        }
    }

    /// Same file, different role.
    pub fn with_role(&self, role: AssetRole) -> Self {
        Self {
            role,
            ..self.clone()
        }
    }
}

/// Which branch produced the scene sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetOrigin {
    MediaIds,
    MediaPaths,
    Synthetic,
    BrandingFallback,
}

/// Ordered scene sources plus where they came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedAssets {
    pub assets: Vec<MediaAsset>,
    pub origin: AssetOrigin,
}

/// Read access to stored media.
pub trait AssetStore: Send + Sync {
    /// Stored path of a media item, as recorded (may be relative).
    fn media_path(&self, id: u64) -> Option<String>;

    /// Watermark logo, when one exists on disk.
    fn logo_path(&self) -> Option<PathBuf>;

    /// Location of a template's background track.
    fn track_path(&self, file_name: &str) -> PathBuf;
}

/// Asset store backed by a JSON manifest of `{ "<id>": "<path>" }`.
#[derive(Debug, Clone, Default)]
pub struct LocalAssetStore {
    media: BTreeMap<u64, String>,
    logo: Option<PathBuf>,
    music_dir: PathBuf,
}

impl LocalAssetStore {
    /// Build a store from configuration, reading the manifest if set.
    pub fn from_config(config: &AppConfig) -> ReelResult<Self> {
        let media = match &config.media_manifest {
            Some(path) => Self::read_manifest(path)?,
            None => BTreeMap::new(),
        };
        Ok(Self {
            media,
            logo: config.logo_path.clone(),
            music_dir: config.music_dir.clone(),
        })
    }

    /// A store over an explicit id map.
    pub fn with_media(media: BTreeMap<u64, String>, music_dir: impl Into<PathBuf>) -> Self {
        Self {
            media,
            logo: None,
            music_dir: music_dir.into(),
        }
    }

    pub fn with_logo(mut self, logo: impl Into<PathBuf>) -> Self {
        self.logo = Some(logo.into());
        self
    }

    fn read_manifest(path: &Path) -> ReelResult<BTreeMap<u64, String>> {
        if !path.exists() {
            return Err(ReelError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let json = std::fs::read_to_string(path)?;
        let raw: BTreeMap<String, String> = serde_json::from_str(&json)?;
        let mut media = BTreeMap::new();
        for (key, value) in raw {
            match key.parse::<u64>() {
                Ok(id) => {
                    media.insert(id, value);
                }
                Err(_) => tracing::warn!(key = %key, "Ignoring non-numeric media manifest key"),
            }
        }
        tracing::debug!(entries = media.len(), manifest = %path.display(), "Loaded media manifest");
        Ok(media)
    }
}

impl AssetStore for LocalAssetStore {
    fn media_path(&self, id: u64) -> Option<String> {
        self.media.get(&id).cloned()
    }

    fn logo_path(&self) -> Option<PathBuf> {
        self.logo.clone().filter(|path| path.exists())
    }

    fn track_path(&self, file_name: &str) -> PathBuf {
        self.music_dir.join(file_name)
    }
}

/// Map a stored media value onto a path the encoder can open.
///
/// URLs and absolute paths pass through. Values under a known content
/// prefix are joined to the storage root as-is; anything else lands under
/// the default content prefix.
pub fn normalize_media_path(value: &str, config: &AppConfig) -> String {
    let value = value.trim();
    if is_remote(value) || Path::new(value).is_absolute() {
        return value.to_string();
    }

    let relative = value.trim_start_matches("./");
    let under_known_root = config
        .known_content_prefixes
        .iter()
        .any(|prefix| relative.starts_with(prefix.as_str()));

    let path = if under_known_root {
        config.storage_root.join(relative)
    } else {
        config
            .storage_root
            .join(&config.default_content_prefix)
            .join(relative)
    };
    path.display().to_string()
}

fn is_remote(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Resolves job options into scene sources.
pub struct AssetResolver<'a> {
    config: &'a AppConfig,
    store: &'a dyn AssetStore,
    encoder: &'a dyn EncoderBackend,
}

impl<'a> AssetResolver<'a> {
    pub fn new(
        config: &'a AppConfig,
        store: &'a dyn AssetStore,
        encoder: &'a dyn EncoderBackend,
    ) -> Self {
        Self {
            config,
            store,
            encoder,
        }
    }

    /// Scene cap in effect, always within `[1, MAX_ASSETS]`.
    pub fn cap(&self) -> usize {
        self.config.render.max_assets.clamp(1, MAX_ASSETS)
    }

    /// Resolve options into at least one and at most [`cap`](Self::cap) assets.
    pub fn resolve(&self, options: &RenderOptions) -> ReelResult<ResolvedAssets> {
        let cap = self.cap();

        let from_ids = self.from_media_ids(&options.media_ids);
        let (paths, origin) = if !from_ids.is_empty() {
            (from_ids, AssetOrigin::MediaIds)
        } else if !options.media_paths.is_empty() {
            let paths = options
                .media_paths
                .iter()
                .map(|p| normalize_media_path(p, self.config))
                .collect();
            (paths, AssetOrigin::MediaPaths)
        } else {
            let theme = options.visual_theme.as_deref().unwrap_or(DEFAULT_THEME);
            self.fallback(theme, cap)?
        };

        let total = paths.len();
        let assets: Vec<MediaAsset> = paths
            .into_iter()
            .take(cap)
            .enumerate()
            .map(|(position, path)| MediaAsset::scene(path, position))
            .collect();

        if total > assets.len() {
            tracing::info!(requested = total, cap, "Capped scene sources");
        }
        tracing::info!(count = assets.len(), origin = ?origin, "Resolved scene sources");

        Ok(ResolvedAssets { assets, origin })
    }

    fn from_media_ids(&self, ids: &[u64]) -> Vec<String> {
        ids.iter()
            .filter_map(|id| match self.store.media_path(*id) {
                Some(stored) => Some(normalize_media_path(&stored, self.config)),
                None => {
                    tracing::warn!(media_id = id, "Media id not found in asset store");
                    None
                }
            })
            .collect()
    }

    /// Synthetic images for a theme, or the branding image as a last resort.
    fn fallback(&self, theme: &str, cap: usize) -> ReelResult<(Vec<String>, AssetOrigin)> {
        let branding = self.config.branding_image.display().to_string();

        if !self.encoder.is_available() {
            tracing::warn!(
                encoder = self.encoder.name(),
                "Encoder unavailable for fallback generation, using branding image"
            );
            return Ok((vec![branding], AssetOrigin::BrandingFallback));
        }

        let generated = self.generate_theme_images(theme, cap)?;
        if !generated.is_empty() {
            return Ok((generated, AssetOrigin::Synthetic));
        }

        if self.config.branding_image.exists() {
            tracing::warn!(theme, "Fallback generation produced nothing, using branding image");
            return Ok((vec![branding], AssetOrigin::BrandingFallback));
        }

        Err(ReelError::asset_resolution(format!(
            "No media resolvable and fallback generation for theme '{theme}' produced no images"
        )))
    }

    fn generate_theme_images(&self, theme: &str, cap: usize) -> ReelResult<Vec<String>> {
        let dir = &self.config.generated_dir;
        std::fs::create_dir_all(dir)?;

        let count = self.config.render.fallback_asset_count.clamp(1, cap);
        let slug = theme_slug(theme);
        let label = sanitize_overlay_text(theme);

        let mut paths = vec![];
        for i in 0..count {
            let color = FALLBACK_PALETTE[i % FALLBACK_PALETTE.len()];
            let token = uuid::Uuid::new_v4().simple().to_string();
            let path = dir.join(format!("gen_{slug}_{i}_{}.png", &token[..8]));
            let args = fallback_image_args(color, &label, &path);

            match self.encoder.run(&args, 0.0, None) {
                Ok(output) if output.success() && path.exists() => {
                    paths.push(path.display().to_string());
                }
                Ok(output) => tracing::warn!(
                    index = i,
                    exit_code = ?output.exit_code,
                    stderr = %output.stderr.trim(),
                    "Fallback image generation failed"
                ),
                Err(e) => tracing::warn!(index = i, error = %e, "Fallback image generation failed"),
            }
        }

        tracing::info!(
            theme,
            requested = count,
            generated = paths.len(),
            "Generated fallback images"
        );
        Ok(paths)
    }
}

/// Encoder arguments rendering one solid-color theme card.
pub fn fallback_image_args(color: &str, label: &str, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "lavfi".to_string(),
        "-i".to_string(),
        format!("color=c={color}:s=720x1280"),
        "-vf".to_string(),
        format!(
            "drawtext=text='{label}':expansion=none:fontcolor=white:fontsize=64:\
             x=(w-text_w)/2:y=(h-text_h)/2"
        ),
        "-frames:v".to_string(),
        "1".to_string(),
        output.display().to_string(),
    ]
}

fn theme_slug(theme: &str) -> String {
    let slug: String = theme
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        DEFAULT_THEME.to_string()
    } else {
        slug.to_string()
    }
}
