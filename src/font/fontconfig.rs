//! fontconfig integration
//!
//! Resolve a configured family name to a font file

use anyhow::{anyhow, Context, Result};
use fontconfig::Fontconfig;
use log::{info, warn};
use std::path::{Path, PathBuf};

/// Font search result
#[derive(Debug, Clone)]
pub struct FontMatch {
    /// Font file path
    pub path: PathBuf,
    /// Font name
    pub family: String,
}

/// Search fonts using fontconfig
pub struct FontFinder {
    fc: Fontconfig,
}

impl FontFinder {
    pub fn new() -> Result<Self> {
        let fc = Fontconfig::new().ok_or_else(|| anyhow!("fontconfig initialization failed"))?;
        info!("fontconfig initialized");
        Ok(Self { fc })
    }

    /// Search by family name, optionally with a style ("Bold", "Italic", ...)
    ///
    /// fontconfig always answers with its closest match, even a completely
    /// unrelated one, so the returned name must contain the request (or the
    /// other way round).
    pub fn find_font(&self, family: &str, style: Option<&str>) -> Option<FontMatch> {
        let font = self.fc.find(family, style)?;
        if family_matches(family, &font.name) {
            return Some(FontMatch {
                path: font.path,
                family: font.name,
            });
        }
        warn!(
            "fontconfig: rejected false match for \"{}\": got \"{}\"",
            family, font.name
        );
        None
    }

    /// First installed monospace font from a list of common coding faces
    pub fn find_monospace(&self) -> Option<FontMatch> {
        let fallbacks = [
            "Fira Code",
            "JetBrains Mono",
            "Cascadia Code",
            "DejaVu Sans Mono",
            "Liberation Mono",
            "Noto Sans Mono",
            "monospace",
        ];

        for name in fallbacks {
            if let Some(m) = self.find_font(name, None) {
                return Some(m);
            }
        }

        warn!("Monospace font not found");
        None
    }
}

fn family_matches(requested: &str, got: &str) -> bool {
    let req = requested.to_ascii_lowercase();
    let got = got.to_ascii_lowercase();
    got.contains(&req) || req.contains(&got)
}

/// Load font file
pub fn load_font_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read font file: {}", path.display()))
}

/// Resolve a font specifier to a file path.
///
/// An existing absolute path is used as is; anything else is treated as a
/// family name for fontconfig, then as a relative path. An empty specifier
/// picks the first available monospace font.
pub fn resolve_font_path(specifier: &str, style: Option<&str>) -> Result<PathBuf> {
    let path = Path::new(specifier);
    if path.is_absolute() && path.exists() {
        return Ok(path.to_path_buf());
    }

    let finder = FontFinder::new()?;
    let found = if specifier.is_empty() {
        finder.find_monospace()
    } else {
        finder.find_font(specifier, style)
    };
    if let Some(font_match) = found {
        info!(
            "Font resolved by name: \"{}\" → {} ({})",
            specifier,
            font_match.family,
            font_match.path.display()
        );
        return Ok(font_match.path);
    }

    if !specifier.is_empty() && path.exists() {
        return Ok(path.to_path_buf());
    }

    Err(anyhow!(
        "Font not found: \"{}\" (not a valid path or font name)",
        specifier
    ))
}

/// Resolve a font specifier and read the file
pub fn resolve_font(specifier: &str) -> Result<Vec<u8>> {
    let path = resolve_font_path(specifier, None)?;
    info!("Font loaded: {}", path.display());
    load_font_file(&path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_match_is_case_insensitive_containment() {
        assert!(family_matches("fira code", "Fira Code"));
        assert!(family_matches("Fira Code Retina", "Fira Code"));
        assert!(!family_matches("Fira Code", "DejaVu Sans"));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = load_font_file(Path::new("/nonexistent/font.ttf")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/font.ttf"));
    }
}
