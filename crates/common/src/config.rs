//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default content root that relative media values are joined to.
    pub storage_root: PathBuf,

    /// Relative prefixes that already live directly under `storage_root`.
    pub known_content_prefixes: Vec<String>,

    /// Sub-directory of `storage_root` used for bare relative media values.
    pub default_content_prefix: String,

    /// Where rendered videos and thumbnails are written.
    pub output_dir: PathBuf,

    /// Where synthetic fallback images are written.
    pub generated_dir: PathBuf,

    /// Directory holding the style templates' background tracks.
    pub music_dir: PathBuf,

    /// Directory holding one JSON record per render job.
    pub jobs_dir: PathBuf,

    /// JSON map of media id to stored path.
    pub media_manifest: Option<PathBuf>,

    /// Watermark logo applied over every render, if present on disk.
    pub logo_path: Option<PathBuf>,

    /// Built-in image used when no other media can be produced.
    pub branding_image: PathBuf,

    /// External encoding engine settings.
    pub encoder: EncoderConfig,

    /// Render defaults.
    pub render: RenderDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// External encoding engine binaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Encoder binary name or path.
    pub ffmpeg_binary: String,

    /// Prober binary name or path.
    pub ffprobe_binary: String,
}

/// Default render parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderDefaults {
    /// Output frame rate.
    pub fps: u32,

    /// Number of synthetic images generated when no media resolves.
    pub fallback_asset_count: usize,

    /// Upper bound on scenes per render.
    pub max_assets: usize,

    /// Fixed call-to-action line on the end card.
    pub call_to_action: String,

    /// Video bitrate in kbps.
    pub video_bitrate_kbps: u32,

    /// Audio bitrate in kbps.
    pub audio_bitrate_kbps: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "promoreel=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data = dirs_default_data();
        let storage_root = data.join("storage");
        Self {
            known_content_prefixes: vec!["properties/".to_string(), "stock/".to_string()],
            default_content_prefix: "properties".to_string(),
            output_dir: storage_root.join("videos"),
            generated_dir: storage_root.join("stock").join("generated"),
            music_dir: storage_root.join("music"),
            jobs_dir: data.join("jobs"),
            media_manifest: None,
            logo_path: None,
            branding_image: storage_root.join("branding").join("default.png"),
            storage_root,
            encoder: EncoderConfig::default(),
            render: RenderDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_binary: "ffmpeg".to_string(),
            ffprobe_binary: "ffprobe".to_string(),
        }
    }
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            fps: 30,
            fallback_asset_count: 6,
            max_assets: 15,
            call_to_action: "Book your stay today".to_string(),
            video_bitrate_kbps: 6000,
            audio_bitrate_kbps: 192,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit file, falling back to defaults.
    pub fn load_from(config_path: &Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config to an explicit file, creating its directory.
    pub fn save_to(&self, config_path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }

    /// Create every directory the renderer writes into.
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        for dir in [
            &self.storage_root,
            &self.output_dir,
            &self.generated_dir,
            &self.music_dir,
            &self.jobs_dir,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// A config whose every directory lives under `root`. Used by tests and
    /// by the CLI `--root` flag.
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let storage_root = root.join("storage");
        Self {
            output_dir: storage_root.join("videos"),
            generated_dir: storage_root.join("stock").join("generated"),
            music_dir: storage_root.join("music"),
            jobs_dir: root.join("jobs"),
            branding_image: storage_root.join("branding").join("default.png"),
            storage_root,
            ..Self::default()
        }
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("promoreel").join("config.json")
}

/// Default data directory.
fn dirs_default_data() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("promoreel")
}
