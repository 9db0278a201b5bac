//! Configuration file management
//!
//! Loads TOML configuration files and provides renderer settings.
//! Default config path: ~/.config/gridglyph/config.toml

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_GLYPH_PADDING, DEFAULT_TEXTURE_LAYERS, DEFAULT_TEXTURE_SIZE, DEFAULT_VARIANT_COUNT, MAX_FONT_SIZE,
    MIN_FONT_SIZE,
};
use crate::utils::color::parse_hex_color_to_rgba;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "GRIDGLYPH_CONFIG";

/// Renderer settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Font settings
    pub font: FontConfig,
    /// Glyph atlas geometry
    pub atlas: AtlasConfig,
    /// Pipeline and colors
    pub render: RenderConfig,
}

/// Font settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// Main font: family name or file path (first monospace font if empty)
    pub family: String,
    /// Dedicated bold face (synthesized from `family` if empty)
    pub bold: String,
    /// Dedicated italic face (synthesized if empty)
    pub italic: String,
    /// Dedicated bold italic face (synthesized if empty)
    pub bold_italic: String,
    /// Font size in logical pixels
    pub size: f32,
    /// Group ligatures using the font's GSUB features
    pub ligatures: bool,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            family: "Fira Code".to_string(),
            bold: String::new(),
            italic: String::new(),
            bold_italic: String::new(),
            size: 14.0,
            ligatures: true,
        }
    }
}

impl FontConfig {
    /// Size clamped to the supported range
    pub fn clamped_size(&self) -> f32 {
        self.size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
    }
}

/// Glyph atlas settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    /// Layer edge length in device pixels
    pub texture_size: u32,
    /// Number of texture array layers; more layers delay exhaustion
    pub layer_count: u32,
    /// Sub-pixel horizontal variants per glyph
    pub variant_count: u32,
    /// Padding around each glyph (logical pixels)
    pub padding: u32,
    /// Device pixels per logical pixel (HiDPI scale)
    pub device_pixel_ratio: f32,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            texture_size: DEFAULT_TEXTURE_SIZE,
            layer_count: DEFAULT_TEXTURE_LAYERS,
            variant_count: DEFAULT_VARIANT_COUNT,
            padding: DEFAULT_GLYPH_PADDING,
            device_pixel_ratio: 1.0,
        }
    }
}

/// Text compositing strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Gamma-corrected coverage pass, then a color pass
    #[default]
    TwoPass,
    /// Premultiplied alpha in one pass
    SinglePass,
}

/// Render settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Text pipeline: "two_pass" or "single_pass"
    pub mode: RenderMode,
    /// Clear color (RRGGBB)
    pub background: String,
    /// Default text color (RRGGBB)
    pub foreground: String,
    /// Cursor color (RRGGBB)
    pub cursor: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            mode: RenderMode::TwoPass,
            background: "1e1e1e".to_string(),
            foreground: "d4d4d4".to_string(),
            cursor: "ffffff".to_string(),
        }
    }
}

impl RenderConfig {
    pub fn background_rgba(&self) -> [f32; 4] {
        parse_hex_color_to_rgba(&self.background, [0.0, 0.0, 0.0, 1.0])
    }

    pub fn foreground_rgba(&self) -> [f32; 4] {
        parse_hex_color_to_rgba(&self.foreground, [1.0, 1.0, 1.0, 1.0])
    }

    pub fn cursor_rgba(&self) -> [f32; 4] {
        parse_hex_color_to_rgba(&self.cursor, [1.0, 1.0, 1.0, 1.0])
    }
}

impl Config {
    /// Get the path that would be used for loading config
    /// Returns None if using built-in defaults
    pub fn config_path() -> Option<PathBuf> {
        // 1. GRIDGLYPH_CONFIG environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let p = Path::new(&path);
            if p.exists() {
                return Some(p.to_path_buf());
            }
            warn!("{} points to a missing file: {}", CONFIG_ENV, path);
        }

        // 2. User config: ~/.config/gridglyph/config.toml
        default_config_path().filter(|p| p.exists())
    }

    /// Load configuration with priority:
    /// 1. GRIDGLYPH_CONFIG environment variable
    /// 2. ~/.config/gridglyph/config.toml
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Some(path) = Self::config_path() {
            match Self::load_from_file(&path) {
                Ok(config) => {
                    info!("Loaded config: {}", path.display());
                    return config;
                }
                Err(e) => {
                    warn!("Failed to load config {}: {:#}", path.display(), e);
                }
            }
        }
        info!("Using built-in default config");
        Self::default()
    }

    /// Load settings from specified path
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize as a TOML template
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("gridglyph").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.font.family, "Fira Code");
        assert!(config.font.ligatures);
        assert_eq!(config.atlas.layer_count, DEFAULT_TEXTURE_LAYERS);
        assert_eq!(config.render.mode, RenderMode::TwoPass);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::parse(
            r#"
[font]
family = "JetBrains Mono"
size = 18.0

[atlas]
layer_count = 8

[render]
mode = "single_pass"
"#,
        )
        .unwrap();
        assert_eq!(config.font.family, "JetBrains Mono");
        assert_eq!(config.font.size, 18.0);
        assert!(config.font.ligatures);
        assert_eq!(config.atlas.layer_count, 8);
        assert_eq!(config.atlas.texture_size, DEFAULT_TEXTURE_SIZE);
        assert_eq!(config.render.mode, RenderMode::SinglePass);
        assert_eq!(config.render.cursor, "ffffff");
    }

    #[test]
    fn test_rejects_unknown_mode() {
        assert!(Config::parse("[render]\nmode = \"lcd\"\n").is_err());
    }

    #[test]
    fn test_template_round_trips() {
        let config = Config::default();
        let text = config.to_toml().unwrap();
        assert_eq!(Config::parse(&text).unwrap(), config);
    }

    #[test]
    fn test_colors_and_size_clamp() {
        let render = RenderConfig {
            background: "ff0000".to_string(),
            foreground: "bogus".to_string(),
            ..RenderConfig::default()
        };
        assert_eq!(render.background_rgba(), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(render.foreground_rgba(), [1.0, 1.0, 1.0, 1.0]);

        let font = FontConfig {
            size: 500.0,
            ..FontConfig::default()
        };
        assert_eq!(font.clamped_size(), MAX_FONT_SIZE);
    }
}
