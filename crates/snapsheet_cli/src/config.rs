//! Snapsheet configuration file handling

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use snapsheet::SheetConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in a directory
pub const CONFIG_FILE: &str = "snapsheet.toml";

/// Top-level configuration (snapsheet.toml)
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct SnapsheetConfig {
    #[serde(default)]
    pub sheet: SheetConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
}

/// Virtual clock settings for `snapsheet replay` and `snapsheet spring`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReplayConfig {
    /// Frame interval in milliseconds
    #[serde(default = "default_frame_ms")]
    pub frame_ms: f64,
    /// Give up settling after this many frames
    #[serde(default = "default_max_frames")]
    pub max_frames: usize,
}

fn default_frame_ms() -> f64 {
    16.0
}

fn default_max_frames() -> usize {
    10_000
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            frame_ms: default_frame_ms(),
            max_frames: default_max_frames(),
        }
    }
}

impl SnapsheetConfig {
    /// Load configuration from a file, or from `snapsheet.toml` in a directory
    pub fn load_from_dir(path: &Path) -> Result<Self> {
        let config_path = config_path(path);

        if !config_path.exists() {
            anyhow::bail!(
                "No {} found in {}. Run `snapsheet init` to create one.",
                CONFIG_FILE,
                path.display()
            );
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: SnapsheetConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        config
            .sheet
            .validate()
            .with_context(|| format!("Invalid sheet settings in {}", config_path.display()))?;
        if !(config.replay.frame_ms.is_finite() && config.replay.frame_ms > 0.0) {
            anyhow::bail!(
                "replay.frame_ms must be positive in {}",
                config_path.display()
            );
        }

        Ok(config)
    }

    /// Load from `path` if given, else from the working directory if a file
    /// exists there, else fall back to defaults
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_dir(path),
            None => {
                let cwd = Path::new(".");
                if config_path(cwd).exists() {
                    Self::load_from_dir(cwd)
                } else {
                    tracing::debug!("no {} in working directory, using defaults", CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    /// Default configuration for a sheet measured at `container_height`
    pub fn new(container_height: f32) -> Self {
        Self {
            sheet: SheetConfig {
                container_height,
                ..SheetConfig::default()
            },
            replay: ReplayConfig::default(),
        }
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}

fn config_path(path: &Path) -> PathBuf {
    if path.is_file() {
        path.to_path_buf()
    } else {
        path.join(CONFIG_FILE)
    }
}
