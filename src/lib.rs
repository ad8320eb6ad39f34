use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod gallery;
pub mod preview;
pub mod source;
pub mod startup_checks;

use gallery::{SortOrder, ZoomLevel};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub app: AppConfig,
    pub gallery: GalleryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub name: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GalleryConfig {
    pub source_directory: PathBuf,
    pub cache_directory: PathBuf,
    /// Directory under the source root whose contents count as deleted.
    #[serde(default = "default_rubbish_directory")]
    pub rubbish_directory: String,
    #[serde(default)]
    pub default_zoom: ZoomLevel,
    #[serde(default)]
    pub sort_order: SortOrder,
    /// Pause between two consecutive backfill fetches.
    pub fetch_throttle_ms: u64,
    /// Window in which refresh requests coalesce into one publish.
    pub refresh_throttle_ms: u64,
    pub thumbnail: ImageSizeConfig,
    pub preview: ImageSizeConfig,
    pub jpeg_quality: Option<u8>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageSizeConfig {
    pub width: u32,
    pub height: u32,
}

fn default_rubbish_directory() -> String {
    "Rubbish".to_string()
}

impl GalleryConfig {
    pub fn thumbnail_directory(&self) -> PathBuf {
        self.cache_directory.join("thumbnails")
    }

    pub fn preview_directory(&self) -> PathBuf {
        self.cache_directory.join("previews")
    }

    pub fn fetch_throttle(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.fetch_throttle_ms)
    }

    pub fn refresh_throttle(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.refresh_throttle_ms)
    }
}

impl Config {
    /// Read a TOML config file, or fall back to defaults when it is absent.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = toml_edit::de::from_str::<Config>(&content)?;
        Ok(config)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    ParseError(#[from] toml_edit::de::Error),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig {
                name: "mediagrid".to_string(),
                log_level: "info".to_string(),
            },
            gallery: GalleryConfig {
                source_directory: PathBuf::from("photos"),
                cache_directory: PathBuf::from("cache"),
                rubbish_directory: default_rubbish_directory(),
                default_zoom: ZoomLevel::default(),
                sort_order: SortOrder::default(),
                fetch_throttle_ms: 10,
                refresh_throttle_ms: 50,
                thumbnail: ImageSizeConfig {
                    width: 200,
                    height: 200,
                },
                preview: ImageSizeConfig {
                    width: 1000,
                    height: 1000,
                },
                jpeg_quality: Some(85),
            },
        }
    }
}
