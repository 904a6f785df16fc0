use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_DESC_PREFIX: &str = "Shopee";
pub const DEFAULT_MAIN_PREFIX: &str = "Main";

/// Overrides the configured maximum slice height when set.
pub const MAX_SLICE_HEIGHT_ENV: &str = "STRIPCUT_MAX_SLICE_HEIGHT";

/// Geometry and budget constants handed to the session at construction.
///
/// All lengths are in composite-image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limits {
    /// Fixed width every source is resized to before stacking.
    pub canvas_width: u32,
    pub max_slice_height: u32,
    /// Output-count budget for the resliced export.
    pub max_images: usize,
    /// Pointer distance from a band edge that grabs the edge for resizing.
    pub edge_margin: f32,
    /// Height a band keeps while one of its edges is dragged.
    pub min_drag_height: f32,
    /// Clearance from both edges required for a click to split a band.
    pub split_clearance: f32,
    /// Bands this tall or shorter are dropped when a gesture ends.
    pub tiny_band_height: f32,
    /// Pointer travel after which a press inside a band becomes a move.
    pub drag_threshold: f32,
    pub thumb_width: u32,
    pub minimap_column_gap: f32,
    pub jpeg_quality: u8,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            canvas_width: 800,
            max_slice_height: 1600,
            max_images: 12,
            edge_margin: 20.0,
            min_drag_height: 10.0,
            split_clearance: 10.0,
            tiny_band_height: 5.0,
            drag_threshold: 5.0,
            thumb_width: 120,
            minimap_column_gap: 10.0,
            jpeg_quality: 95,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
/// Persisted UI/application settings for stripcut.
pub struct AppConfig {
    pub window_width: Option<f32>,
    pub window_height: Option<f32>,
    pub last_open_dir: Option<PathBuf>,
    pub last_export_dir: Option<PathBuf>,
    pub desc_prefix: Option<String>,
    pub main_prefix: Option<String>,
    pub max_slice_height: Option<u32>,
    pub max_images: Option<usize>,
}

impl AppConfig {
    /// Returns the user config file path, if a config directory is available.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("stripcut").join("config.toml"))
    }

    /// Loads config from disk, falling back to defaults on any error.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        let Ok(contents) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        toml::from_str(&contents).unwrap_or_default()
    }

    /// Writes config to disk, ignoring filesystem/serialization errors.
    pub fn save(&self) {
        let Some(path) = Self::config_path() else {
            return;
        };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(s) = toml::to_string_pretty(self) {
            let _ = std::fs::write(&path, s);
        }
    }

    /// Effective limits: built-in defaults with non-zero overrides applied.
    pub fn limits(&self) -> Limits {
        let env_height = std::env::var(MAX_SLICE_HEIGHT_ENV).ok();
        self.limits_with_env(env_height.as_deref())
    }

    fn limits_with_env(&self, env_height: Option<&str>) -> Limits {
        let mut limits = Limits::default();
        let env_height = env_height
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|&h| h > 0);
        if let Some(h) = env_height.or(self.max_slice_height.filter(|&h| h > 0)) {
            limits.max_slice_height = h;
        }
        if let Some(n) = self.max_images.filter(|&n| n > 0) {
            limits.max_images = n;
        }
        limits
    }

    pub fn desc_prefix(&self) -> String {
        self.desc_prefix
            .clone()
            .unwrap_or_else(|| DEFAULT_DESC_PREFIX.to_string())
    }

    pub fn main_prefix(&self) -> String {
        self.main_prefix
            .clone()
            .unwrap_or_else(|| DEFAULT_MAIN_PREFIX.to_string())
    }
}
