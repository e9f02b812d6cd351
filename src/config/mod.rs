//! Renderer configuration structures and loading logic.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::atlas::PackerKind;

/// Smallest and largest atlas edge accepted from the config file.
const MIN_ATLAS_SIZE: u32 = 64;
const MAX_ATLAS_SIZE: u32 = 16_384;

/// Top-level renderer configuration (`render.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub atlas: AtlasConfig,
    pub raster: RasterConfig,
    pub present: PresentConfig,
    pub font: FontConfig,
    pub debug: DebugConfig,
    /// WGSL file replacing the text fragment stage. Forces full redraws.
    pub custom_shader: Option<PathBuf>,
}

/// Glyph atlas configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    /// Atlas edge length in pixels (rounded up to a power of two).
    pub size: u32,
    pub packer: PackerKind,
}

/// Off-screen rasterization target configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterConfig {
    pub initial_target_width: u32,
    pub initial_target_height: u32,
    /// Rasterization attempts per glyph before it is skipped for the frame.
    pub max_attempts: u32,
}

/// Presentation and pacing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentConfig {
    /// Upper bound for `wait_until_can_render()`.
    pub frame_latency_timeout_ms: u64,
    pub vsync: bool,
    /// Clear color as "#RRGGBB".
    pub background: String,
}

/// Font used by the demo driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub path: Option<PathBuf>,
    /// Font size in device pixels.
    pub size: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Redraw every tick regardless of invalidation (profiling).
    pub continuous_redraw: bool,
    /// `log` level name: "off", "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            size: 2048,
            packer: PackerKind::Guillotine,
        }
    }
}

impl AtlasConfig {
    /// Returns the atlas edge as a power of two within the supported range.
    pub fn effective_size(&self) -> u32 {
        self.size
            .clamp(MIN_ATLAS_SIZE, MAX_ATLAS_SIZE)
            .next_power_of_two()
    }
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            initial_target_width: 64,
            initial_target_height: 64,
            max_attempts: 4,
        }
    }
}

impl RasterConfig {
    /// Returns the attempt budget, never less than one.
    pub fn effective_max_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for PresentConfig {
    fn default() -> Self {
        Self {
            frame_latency_timeout_ms: 100,
            vsync: true,
            background: "#1e1e2e".to_owned(),
        }
    }
}

impl PresentConfig {
    /// Returns the background as linear-blend-ready RGBA, falling back to black.
    pub fn background_rgba(&self) -> [f32; 4] {
        parse_hex_color(&self.background).unwrap_or([0.0, 0.0, 0.0, 1.0])
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            continuous_redraw: false,
            log_level: "info".to_owned(),
        }
    }
}

impl DebugConfig {
    /// Parsed log level, falling back to `Info` on unknown names.
    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            path: None,
            size: 16.0,
        }
    }
}

impl RenderConfig {
    /// Load config from the default path, falling back to defaults.
    pub fn load() -> Self {
        let path = config_path();
        let data = match std::fs::read_to_string(&path) {
            Ok(d) => d,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("config: failed to read {}: {e}", path.display());
                }
                return Self::default();
            }
        };

        match toml::from_str(&data) {
            Ok(cfg) => {
                log::info!("config: loaded from {}", path.display());
                cfg
            }
            Err(e) => {
                log::warn!("config: parse error in {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Whether every frame has to be a full redraw: a custom shader is
    /// configured and its source can be read.
    pub fn uses_custom_shader(&self) -> bool {
        self.custom_shader_source().is_some()
    }

    /// Read the custom shader source, if one is configured and readable.
    pub fn custom_shader_source(&self) -> Option<String> {
        let path = self.custom_shader.as_ref()?;
        match std::fs::read_to_string(path) {
            Ok(src) => Some(src),
            Err(e) => {
                log::warn!("config: failed to read shader {}: {e}", path.display());
                None
            }
        }
    }
}

/// Parse "#RRGGBB" into RGBA with alpha 1.0.
pub fn parse_hex_color(s: &str) -> Option<[f32; 4]> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let v = u32::from_str_radix(hex, 16).ok()?;
    Some([
        ((v >> 16) & 0xFF) as f32 / 255.0,
        ((v >> 8) & 0xFF) as f32 / 255.0,
        (v & 0xFF) as f32 / 255.0,
        1.0,
    ])
}

/// Return the platform-specific configuration directory.
pub fn config_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("oriterm_atlas");
        }
        PathBuf::from(".").join("oriterm_atlas")
    }
    #[cfg(not(target_os = "windows"))]
    {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("oriterm_atlas");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".config").join("oriterm_atlas");
        }
        PathBuf::from(".").join("oriterm_atlas")
    }
}

pub fn config_path() -> PathBuf {
    config_dir().join("render.toml")
}

#[cfg(test)]
mod tests;
