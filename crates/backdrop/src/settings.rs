use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::controller::ControllerOptions;
use crate::key::DEFAULT_PREFIX;
use crate::video::DEFAULT_MIN_SURFACE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub version: u32,
    /// Directory scanned for background images and videos.
    pub media_dir: PathBuf,
    pub key_prefix: String,
    /// Extension tried for speculative prepares of unlisted videos.
    pub video_extension: String,
    pub min_surface: [u32; 2],
    pub frame_interval_ms: u64,
    pub prefer_video: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: 1,
            media_dir: PathBuf::from("media"),
            key_prefix: DEFAULT_PREFIX.to_string(),
            video_extension: "mp4".to_string(),
            min_surface: [DEFAULT_MIN_SURFACE.0, DEFAULT_MIN_SURFACE.1],
            frame_interval_ms: 16,
            prefer_video: false,
        }
    }
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("backdrop").join("settings.json"))
    }

    /// Load from the user config dir, falling back to defaults.
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                if path.exists() {
                    log::warn!("Using default settings: {e:#}");
                }
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse settings {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Saved settings to {}", path.display());
        Ok(())
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            min_surface: (self.min_surface[0], self.min_surface[1]),
            prefer_video: self.prefer_video,
        }
    }
}
