//! CPU glyph rasterization
//!
//! The atlas only sees the [`GlyphRasterizer`] capability; production code
//! draws with fontdue into an RGBA8 surface the size of one texture layer.

use std::rc::Rc;

use anyhow::{anyhow, Result};
use fontdue::Font;
use log::debug;

use super::face::StyledFonts;
use crate::constants::{LIGATURE_FEATURES, SYNTHETIC_ITALIC_SHEAR};
use crate::shaping::{GlyphInfo, ShapingTables, Tag};

/// Extra advance added by synthetic bold (logical pixels)
const SYNTHETIC_BOLD_EXTRA: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl FontStyle {
    pub fn from_flags(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (false, false) => FontStyle::Regular,
            (true, false) => FontStyle::Bold,
            (false, true) => FontStyle::Italic,
            (true, true) => FontStyle::BoldItalic,
        }
    }
}

/// Rasterizing surface used by the glyph atlas
pub trait GlyphRasterizer {
    /// Advance width of `text` in logical pixels
    fn measure(&mut self, text: &str, style: FontStyle) -> f32;

    /// Line height in logical pixels
    fn line_height(&self) -> f32;

    /// Clear the whole surface to the background
    fn fill_background(&mut self);

    /// Draw `text` with its top-left corner at `origin` (device pixels)
    fn rasterize(&mut self, text: &str, style: FontStyle, origin: (f32, f32));

    /// RGBA8 pixels, `surface_size()²` of them
    fn surface(&self) -> &[u8];

    /// Edge length of the square surface in device pixels
    fn surface_size(&self) -> u32;
}

/// fontdue-backed rasterizer.
///
/// Pixels are premultiplied white with the coverage in every channel; the
/// shaders tint them with the cell foreground.
pub struct FontdueRasterizer {
    fonts: StyledFonts,
    /// Logical font size in pixels
    font_size: f32,
    device_pixel_ratio: f32,
    ascent: f32,
    line_height: f32,
    /// Ligature substitution for the regular face
    shaping: Option<(ShapingTables, Rc<[Tag]>)>,
    surface: Vec<u8>,
    size: u32,
}

impl FontdueRasterizer {
    pub fn new(fonts: StyledFonts, font_size: f32, device_pixel_ratio: f32, surface_size: u32) -> Result<Self> {
        let metrics = fonts
            .regular
            .horizontal_line_metrics(font_size)
            .ok_or_else(|| anyhow!("Cannot get line metrics"))?;
        Ok(Self {
            fonts,
            font_size,
            device_pixel_ratio,
            ascent: metrics.ascent,
            line_height: metrics.ascent - metrics.descent,
            shaping: None,
            surface: vec![0; (surface_size as usize).pow(2) * 4],
            size: surface_size,
        })
    }

    /// Draw multi-character clusters with the font's ligature glyphs
    pub fn with_shaping(mut self, tables: ShapingTables) -> Self {
        let wanted: Vec<Tag> = LIGATURE_FEATURES.iter().map(|t| Tag::from_bytes(t)).collect();
        let features = tables.supported_features(&wanted);
        if !features.is_empty() {
            self.shaping = Some((tables, features.into()));
        }
        self
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    /// Distance from the top of a line to the baseline (logical pixels)
    pub fn ascent(&self) -> f32 {
        self.ascent
    }

    /// Glyph ids for `text`, ligature-substituted when drawing with the
    /// regular outlines
    fn glyph_ids(&self, font: &Font, regular_outlines: bool, text: &str) -> Vec<u16> {
        match &self.shaping {
            Some((tables, features)) if regular_outlines && text.chars().nth(1).is_some() => {
                let mut glyphs: Vec<GlyphInfo> = text
                    .chars()
                    .map(|c| GlyphInfo::new(font.lookup_glyph_index(c), vec![c], features.clone()))
                    .collect();
                tables.substitute(features, &mut glyphs);
                glyphs.iter().map(|g| g.id).collect()
            }
            _ => text.chars().map(|c| font.lookup_glyph_index(c)).collect(),
        }
    }

    fn draw_glyph(&mut self, bitmap: &[u8], metrics: &fontdue::Metrics, pen_x: f32, baseline: f32, bold: bool, italic: bool) {
        let dilate = if bold { self.device_pixel_ratio.round().max(1.0) as usize } else { 0 };
        draw_coverage(&mut self.surface, self.size, bitmap, metrics, (pen_x, baseline), dilate, italic);
    }
}

/// Draw one glyph's coverage bitmap into an RGBA8 `surface` of
/// `size`² pixels, `origin` being the pen position on the baseline.
///
/// Rows are resampled linearly over the fractional pen offset, dilated
/// rightwards by `dilate` pixels for synthetic bold, and shifted by their
/// height above the baseline for synthetic italic. Overlapping glyphs keep
/// the larger coverage.
fn draw_coverage(
    surface: &mut [u8],
    size: u32,
    bitmap: &[u8],
    metrics: &fontdue::Metrics,
    origin: (f32, f32),
    dilate: usize,
    italic: bool,
) {
    let (w, h) = (metrics.width, metrics.height);
    if w == 0 || h == 0 {
        return;
    }
    let (pen_x, baseline) = origin;
    let top = (baseline - (metrics.ymin as f32 + h as f32)).round() as i64;
    let left = pen_x + metrics.xmin as f32;
    let size = size as i64;
    let mut row_buf = vec![0f32; w + 2 + dilate];

    for y in 0..h {
        let dest_y = top + y as i64;
        if dest_y < 0 || dest_y >= size {
            continue;
        }
        let shear = if italic {
            // height of the pixel centre above the baseline
            let above = (metrics.ymin + h as i32 - y as i32) as f32 - 0.5;
            above * SYNTHETIC_ITALIC_SHEAR
        } else {
            0.0
        };

        let pos = left + shear;
        let start = pos.floor();
        let frac = pos - start;
        row_buf.iter_mut().for_each(|v| *v = 0.0);
        for (x, &cov) in bitmap[y * w..(y + 1) * w].iter().enumerate() {
            let cov = cov as f32;
            row_buf[x] += cov * (1.0 - frac);
            row_buf[x + 1] += cov * frac;
        }
        for _ in 0..dilate {
            for i in (1..row_buf.len()).rev() {
                row_buf[i] = row_buf[i].max(row_buf[i - 1]);
            }
        }

        let row = (dest_y * size) as usize;
        for (i, &cov) in row_buf.iter().enumerate() {
            let dest_x = start as i64 + i as i64;
            if cov <= 0.0 || dest_x < 0 || dest_x >= size {
                continue;
            }
            let value = cov.round().min(255.0) as u8;
            let px = (row + dest_x as usize) * 4;
            for channel in &mut surface[px..px + 4] {
                *channel = (*channel).max(value);
            }
        }
    }
}

impl GlyphRasterizer for FontdueRasterizer {
    fn measure(&mut self, text: &str, style: FontStyle) -> f32 {
        let (font, synth_bold, _) = self.fonts.face(style);
        let regular = std::ptr::eq(font, &self.fonts.regular);
        let width: f32 = self
            .glyph_ids(font, regular, text)
            .into_iter()
            .map(|id| font.metrics_indexed(id, self.font_size).advance_width)
            .sum();
        if synth_bold {
            width + SYNTHETIC_BOLD_EXTRA
        } else {
            width
        }
    }

    fn line_height(&self) -> f32 {
        self.line_height
    }

    fn fill_background(&mut self) {
        self.surface.fill(0);
    }

    fn rasterize(&mut self, text: &str, style: FontStyle, origin: (f32, f32)) {
        let px_size = self.font_size * self.device_pixel_ratio;
        let baseline = origin.1 + self.ascent * self.device_pixel_ratio;

        // rasterize first, then draw; the fonts are borrowed from self
        let (glyphs, synth_bold, synth_italic) = {
            let (font, bold, italic) = self.fonts.face(style);
            let regular = std::ptr::eq(font, &self.fonts.regular);
            let glyphs: Vec<(fontdue::Metrics, Vec<u8>)> = self
                .glyph_ids(font, regular, text)
                .into_iter()
                .map(|id| font.rasterize_indexed(id, px_size))
                .collect();
            (glyphs, bold, italic)
        };

        let mut pen_x = origin.0;
        for (metrics, bitmap) in &glyphs {
            self.draw_glyph(bitmap, metrics, pen_x, baseline, synth_bold, synth_italic);
            pen_x += metrics.advance_width;
        }
        debug!(
            "Rasterized {:?} ({:?}) at ({:.2}, {:.2}), {} glyphs",
            text,
            style,
            origin.0,
            origin.1,
            glyphs.len()
        );
    }

    fn surface(&self) -> &[u8] {
        &self.surface
    }

    fn surface_size(&self) -> u32 {
        self.size
    }
}
