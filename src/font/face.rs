//! Loaded font faces
//!
//! A [`FontFace`] pairs the fontdue outline font (character map and
//! rasterization) with the GSUB/GDEF shaping tables of the same file.

use anyhow::{anyhow, Context, Result};
use fontdue::{Font, FontSettings};
use log::{info, warn};

use super::fontconfig::{load_font_file, resolve_font_path};
use super::rasterizer::FontStyle;
use crate::config::FontConfig;
use crate::shaping::ShapingTables;

/// Character → glyph id mapping
pub trait GlyphMapper {
    /// Glyph id for `c`, 0 (`.notdef`) when the font lacks it
    fn glyph_index(&self, c: char) -> u16;
}

impl GlyphMapper for Font {
    fn glyph_index(&self, c: char) -> u16 {
        self.lookup_glyph_index(c)
    }
}

impl GlyphMapper for fn(char) -> u16 {
    fn glyph_index(&self, c: char) -> u16 {
        self(c)
    }
}

pub struct FontFace {
    pub name: String,
    pub font: Font,
    pub tables: ShapingTables,
}

impl FontFace {
    /// Resolve `specifier` (family name or path) and load it
    pub fn load(specifier: &str) -> Result<Self> {
        let path = resolve_font_path(specifier, None)?;
        let data = load_font_file(&path)?;
        Self::from_bytes(specifier, &data)
    }

    /// Parse a font file already in memory.
    ///
    /// Broken layout tables only cost the ligatures; the face still loads.
    pub fn from_bytes(name: &str, data: &[u8]) -> Result<Self> {
        let font = Font::from_bytes(data, FontSettings::default())
            .map_err(|e| anyhow!("Failed to load font \"{}\": {}", name, e))?;
        let tables = match ShapingTables::parse(data, 0) {
            Ok(tables) => tables,
            Err(e) => {
                warn!("\"{}\": layout tables unusable, ligatures disabled: {}", name, e);
                ShapingTables::default()
            }
        };
        Ok(Self {
            name: name.to_string(),
            font,
            tables,
        })
    }
}

/// Outline fonts for the four styles; missing styles are synthesized from
/// the regular face
pub struct StyledFonts {
    pub regular: Font,
    pub bold: Option<Font>,
    pub italic: Option<Font>,
    pub bold_italic: Option<Font>,
}

impl StyledFonts {
    pub fn load(config: &FontConfig) -> Result<Self> {
        let regular = load_outline(&config.family, None)
            .with_context(|| format!("Failed to load font family \"{}\"", config.family))?;

        let styled = |specifier: &str, style: &str| -> Option<Font> {
            if specifier.is_empty() {
                return None;
            }
            match load_outline(specifier, Some(style)) {
                Ok(font) => Some(font),
                Err(e) => {
                    warn!("{} face \"{}\" not loaded, synthesizing: {:#}", style, specifier, e);
                    None
                }
            }
        };

        let fonts = Self {
            bold: styled(&config.bold, "Bold"),
            italic: styled(&config.italic, "Italic"),
            bold_italic: styled(&config.bold_italic, "Bold Italic"),
            regular,
        };
        info!(
            "Fonts loaded: bold={}, italic={}, bold_italic={}",
            fonts.bold.is_some(),
            fonts.italic.is_some(),
            fonts.bold_italic.is_some()
        );
        Ok(fonts)
    }

    pub fn from_regular(regular: Font) -> Self {
        Self {
            regular,
            bold: None,
            italic: None,
            bold_italic: None,
        }
    }

    /// Face for `style` plus the (bold, italic) effects still to synthesize
    pub fn face(&self, style: FontStyle) -> (&Font, bool, bool) {
        match style {
            FontStyle::Regular => (&self.regular, false, false),
            FontStyle::Bold => match &self.bold {
                Some(f) => (f, false, false),
                None => (&self.regular, true, false),
            },
            FontStyle::Italic => match &self.italic {
                Some(f) => (f, false, false),
                None => (&self.regular, false, true),
            },
            FontStyle::BoldItalic => match (&self.bold_italic, &self.bold, &self.italic) {
                (Some(f), _, _) => (f, false, false),
                (None, Some(f), _) => (f, false, true),
                (None, None, Some(f)) => (f, true, false),
                (None, None, None) => (&self.regular, true, true),
            },
        }
    }
}

fn load_outline(specifier: &str, style: Option<&str>) -> Result<Font> {
    let path = resolve_font_path(specifier, style)?;
    let data = load_font_file(&path)?;
    Font::from_bytes(data.as_slice(), FontSettings::default())
        .map_err(|e| anyhow!("Failed to load font {}: {}", path.display(), e))
}
