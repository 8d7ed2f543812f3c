//! Persisted settings and configuration IO.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::wallpaper::StyleMode;
use crate::watermark::WatermarkPlacement;

/// File name used under the per-user config directory.
const SETTINGS_FILE: &str = "settings.json";

/// Serializable watermark entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatermarkSetting {
    /// Image path, relative to `base_dir` unless absolute.
    pub path: String,
    /// Divisor applied to the watermark's width and height.
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub x: i64,
    #[serde(default)]
    pub y: i64,
}

fn default_scale() -> f64 {
    1.0
}

impl WatermarkSetting {
    pub fn placement(&self) -> WatermarkPlacement {
        WatermarkPlacement::new(self.scale, self.x, self.y)
    }
}

/// Settings persisted to `settings.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GreylineSettings {
    /// Directory relative file names are resolved against (defaults to the working directory).
    pub base_dir: Option<String>,
    /// Daytime map.
    pub day: String,
    /// Nighttime map.
    pub night: String,
    /// Terminator mask, ideally lossless.
    pub mask: String,
    /// Composite output.
    pub output: String,
    /// Optional callsign overlay.
    pub watermark: Option<WatermarkSetting>,
    /// Push the render to the desktop background after writing it.
    pub set_wallpaper: bool,
    /// How the desktop fits the render.
    pub wallpaper_style: StyleMode,
    /// Re-render interval used by refresh mode.
    pub refresh_interval_secs: Option<u64>,
}

impl Default for GreylineSettings {
    fn default() -> Self {
        Self {
            base_dir: None,
            day: "day_low.png".to_string(),
            night: "night_low.png".to_string(),
            mask: "mask_low.png".to_string(),
            output: "render.png".to_string(),
            watermark: None,
            set_wallpaper: false,
            wallpaper_style: StyleMode::default(),
            refresh_interval_secs: None,
        }
    }
}

impl GreylineSettings {
    /// Directory that relative file names resolve against.
    pub fn base_dir(&self) -> Result<PathBuf> {
        match &self.base_dir {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => std::env::current_dir().context("failed to resolve working directory"),
        }
    }
}

/// Resolve the per-user settings file path and ensure its directory exists.
pub fn settings_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("dev", "greyline", "greyline")
        .ok_or_else(|| anyhow!("cannot determine config directory"))?;
    let config_dir = proj_dirs.config_dir();
    fs::create_dir_all(config_dir)?;
    Ok(config_dir.join(SETTINGS_FILE))
}

/// Load settings from `path`, returning defaults when missing or unreadable.
pub fn load_from(path: &Path) -> GreylineSettings {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "no settings file, using defaults");
            return GreylineSettings::default();
        }
    };
    match serde_json::from_str(&contents) {
        Ok(settings) => settings,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ignoring malformed settings");
            GreylineSettings::default()
        }
    }
}

/// Load settings from the per-user config directory.
pub fn load() -> GreylineSettings {
    match settings_path() {
        Ok(path) => load_from(&path),
        Err(_) => GreylineSettings::default(),
    }
}

/// Persist settings to `path` as pretty JSON.
pub fn save_to(settings: &GreylineSettings, path: &Path) -> Result<()> {
    let contents = serde_json::to_string_pretty(settings)?;
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Persist settings to the per-user config directory.
pub fn save(settings: &GreylineSettings) -> Result<PathBuf> {
    let path = settings_path()?;
    save_to(settings, &path)?;
    Ok(path)
}
