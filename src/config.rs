//! Application configuration management.
//!
//! This module handles loading and saving application-wide settings: the
//! recommendation priority order and mode, the media extension set, and an
//! optional ffprobe directory override. Settings live in a JSON file under
//! the platform config directory; the scan cache database lives under the
//! platform data directory.

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::recommender::{RecommendationMode, Rule};
use crate::scanner::DEFAULT_EXTENSIONS;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Ordered tie-break rules for the recommender.
    #[serde(default = "default_priority_order")]
    pub priority_order: Vec<Rule>,

    /// How winners and losers are marked.
    #[serde(default)]
    pub recommendation_mode: RecommendationMode,

    /// File extensions treated as media files.
    #[serde(default = "default_extensions")]
    pub media_extensions: Vec<String>,

    /// Directory containing the ffprobe binary; `None` resolves from PATH.
    #[serde(default)]
    pub ffprobe_dir: Option<PathBuf>,
}

fn default_priority_order() -> Vec<Rule> {
    vec![Rule::QualityDesc, Rule::SizeDesc]
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|s| (*s).to_string()).collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            priority_order: default_priority_order(),
            recommendation_mode: RecommendationMode::Suggest,
            media_extensions: default_extensions(),
            ffprobe_dir: None,
        }
    }
}

impl Config {
    /// Load the configuration from the default platform-specific path.
    pub fn load() -> Self {
        match Self::load_internal() {
            Ok(config) => config,
            Err(e) => {
                log::debug!("Failed to load config, using defaults: {}", e);
                Self::default()
            }
        }
    }

    fn load_internal() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save the configuration to the default platform-specific path.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the default platform-specific configuration path.
    fn config_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.json"))
    }

    /// Default location of the scan cache database.
    pub fn default_cache_path() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.data_dir().join("scan_cache.db"))
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("com", "mediadupe", "mediadupe")
            .ok_or_else(|| anyhow::anyhow!("Failed to determine project directories"))
    }
}
