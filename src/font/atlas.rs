//! Glyph atlas
//!
//! Rasterizes text clusters on demand and packs them into the layers of a
//! 2D-array texture. Packing is shelf-style: glyphs fill a row left to
//! right, rows fill a layer top to bottom, and a full layer moves packing
//! to the next one. Nothing is ever evicted; running out of layers is the
//! one hard failure.

use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, info, warn};
use smol_str::SmolStr;

use super::rasterizer::{FontStyle, GlyphRasterizer};
use crate::config::AtlasConfig;
use crate::error::AtlasError;

/// Placement and metrics of one rasterized cluster
#[derive(Debug, Clone, PartialEq)]
pub struct RasterizedGlyph {
    /// Quad width in logical pixels, padding included
    pub width: u32,
    /// Quad height in logical pixels, padding included
    pub height: u32,
    pub texture_layer: u32,
    /// Normalized (0..1) texture coordinates of the top-left corner
    pub texture_u: f32,
    pub texture_v: f32,
    /// Normalized (0..1) extent in the texture
    pub texture_width: f32,
    pub texture_height: f32,
    /// Sub-pixel shift baked into the bitmap (logical pixels)
    pub variant_offset: f32,
    /// Padding on each side (logical pixels)
    pub padding: u32,
}

/// Atlas geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtlasSettings {
    /// Edge length of one layer in device pixels
    pub texture_size: u32,
    pub layer_count: u32,
    /// Number of sub-pixel horizontal variants
    pub variant_count: u32,
    /// Padding around each glyph (logical pixels)
    pub padding: u32,
    pub device_pixel_ratio: f32,
}

impl AtlasSettings {
    pub fn from_config(config: &AtlasConfig) -> Self {
        Self {
            texture_size: config.texture_size.max(1),
            layer_count: config.layer_count.max(1),
            variant_count: config.variant_count.max(1),
            padding: config.padding,
            device_pixel_ratio: if config.device_pixel_ratio > 0.0 {
                config.device_pixel_ratio
            } else {
                1.0
            },
        }
    }

    /// Largest glyph edge that fits in one layer (logical pixels)
    fn max_logical_extent(&self) -> u32 {
        (self.texture_size as f32 / self.device_pixel_ratio).floor() as u32
    }

    fn fits(&self, logical: u32) -> bool {
        logical as f32 * self.device_pixel_ratio <= self.texture_size as f32
    }
}

impl Default for AtlasSettings {
    fn default() -> Self {
        Self::from_config(&AtlasConfig::default())
    }
}

/// GPU side of the atlas
pub trait AtlasTexture {
    /// Replace the contents of `layer` with `pixels` (RGBA8, `size`²)
    fn upload_layer(&mut self, layer: u32, pixels: &[u8], size: u32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasStats {
    /// Active layer
    pub layer: u32,
    /// Rows opened so far, across all layers
    pub rows: u32,
    pub glyphs: usize,
    pub exhausted: bool,
}

type VariantMap = HashMap<u32, Rc<RasterizedGlyph>>;

pub struct GlyphAtlas<R> {
    rasterizer: R,
    settings: AtlasSettings,
    /// text → style → variant
    cache: HashMap<SmolStr, HashMap<FontStyle, VariantMap>>,
    layer: u32,
    /// Shelf packing cursor (logical pixels)
    cursor_x: u32,
    cursor_y: u32,
    row_height: u32,
    rows: u32,
    glyph_count: usize,
    /// GPU re-upload flag
    dirty: bool,
    exhausted: bool,
    /// Snapshots of layers left behind before their last upload
    retired: Vec<(u32, Vec<u8>)>,
}

impl<R: GlyphRasterizer> GlyphAtlas<R> {
    pub fn new(mut rasterizer: R, settings: AtlasSettings) -> Self {
        rasterizer.fill_background();
        info!(
            "Glyph atlas: {} layers of {}x{} px, {} variants, dpr {}",
            settings.layer_count,
            settings.texture_size,
            settings.texture_size,
            settings.variant_count,
            settings.device_pixel_ratio
        );
        Self {
            rasterizer,
            settings,
            cache: HashMap::new(),
            layer: 0,
            cursor_x: 0,
            cursor_y: 0,
            row_height: 0,
            rows: 1,
            glyph_count: 0,
            dirty: false,
            exhausted: false,
            retired: Vec::new(),
        }
    }

    pub fn settings(&self) -> &AtlasSettings {
        &self.settings
    }

    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    pub fn rasterizer_mut(&mut self) -> &mut R {
        &mut self.rasterizer
    }

    /// Cell size in logical pixels, from the advance of 'M'
    pub fn cell_size(&mut self) -> (f32, f32) {
        let width = self.rasterizer.measure("M", FontStyle::Regular);
        (width, self.rasterizer.line_height())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Cached glyph for `text`, rasterizing it on first use
    pub fn get_glyph(
        &mut self,
        text: &str,
        is_bold: bool,
        is_italic: bool,
        variant_index: u32,
    ) -> Result<Rc<RasterizedGlyph>, AtlasError> {
        let style = FontStyle::from_flags(is_bold, is_italic);
        let variant = variant_index.min(self.settings.variant_count.saturating_sub(1));

        if let Some(glyph) = self
            .cache
            .get(text)
            .and_then(|styles| styles.get(&style))
            .and_then(|variants| variants.get(&variant))
        {
            return Ok(glyph.clone());
        }

        if self.exhausted {
            return Err(self.exhausted_error());
        }

        let glyph = Rc::new(self.place(text, style, variant)?);
        self.cache
            .entry(SmolStr::new(text))
            .or_default()
            .entry(style)
            .or_default()
            .insert(variant, glyph.clone());
        self.glyph_count += 1;
        Ok(glyph)
    }

    fn exhausted_error(&self) -> AtlasError {
        AtlasError::TextureSpaceExhausted {
            layers: self.settings.layer_count,
            texture_size: self.settings.texture_size,
        }
    }

    /// Reserve space for `text` and draw it
    fn place(&mut self, text: &str, style: FontStyle, variant: u32) -> Result<RasterizedGlyph, AtlasError> {
        let settings = self.settings;
        let pad = settings.padding;
        let variant_offset = variant as f32 / settings.variant_count as f32;
        let max_extent = settings.max_logical_extent();

        let measured = self.rasterizer.measure(text, style);
        let mut width = (measured + variant_offset + 2.0 * pad as f32).ceil() as u32;
        let mut height = (self.rasterizer.line_height() + 2.0 * pad as f32).ceil() as u32;
        if width > max_extent || height > max_extent {
            warn!(
                "Glyph {:?} ({}x{}) exceeds atlas layer, clipping to {} px",
                text, width, height, max_extent
            );
            width = width.min(max_extent);
            height = height.min(max_extent);
        }

        if !settings.fits(self.cursor_x + width) {
            self.cursor_y += self.row_height;
            self.cursor_x = 0;
            self.row_height = 0;
            self.rows += 1;
        }
        if !settings.fits(self.cursor_y + height) {
            self.next_layer()?;
        }

        let (x, y) = (self.cursor_x, self.cursor_y);
        let dpr = settings.device_pixel_ratio;
        self.rasterizer.rasterize(
            text,
            style,
            (
                (x as f32 + pad as f32 + variant_offset) * dpr,
                (y as f32 + pad as f32) * dpr,
            ),
        );
        self.cursor_x += width;
        self.row_height = self.row_height.max(height);
        self.dirty = true;

        let size = settings.texture_size as f32;
        let glyph = RasterizedGlyph {
            width,
            height,
            texture_layer: self.layer,
            texture_u: x as f32 * dpr / size,
            texture_v: y as f32 * dpr / size,
            texture_width: width as f32 * dpr / size,
            texture_height: height as f32 * dpr / size,
            variant_offset,
            padding: pad,
        };
        debug!(
            "Atlas placed {:?} {:?} v{} at layer {} ({}, {}) {}x{}",
            text, style, variant, self.layer, x, y, width, height
        );
        Ok(glyph)
    }

    fn next_layer(&mut self) -> Result<(), AtlasError> {
        if self.layer + 1 >= self.settings.layer_count {
            self.exhausted = true;
            warn!(
                "Glyph atlas exhausted after {} layers ({} glyphs)",
                self.settings.layer_count, self.glyph_count
            );
            return Err(self.exhausted_error());
        }
        if self.dirty {
            self.retired.push((self.layer, self.rasterizer.surface().to_vec()));
        }
        self.layer += 1;
        self.rasterizer.fill_background();
        self.cursor_x = 0;
        self.cursor_y = 0;
        self.row_height = 0;
        self.rows += 1;
        info!("Glyph atlas advanced to layer {}", self.layer);
        Ok(())
    }

    /// Flush one pending layer to the GPU; no-op unless something was drawn
    /// since the last upload
    ///
    /// Layers packing has moved past go first, oldest first. The atlas stays
    /// dirty until the active layer itself has been uploaded.
    pub fn upload_texture<T: AtlasTexture + ?Sized>(&mut self, texture: &mut T) {
        if !self.dirty {
            return;
        }
        let size = self.rasterizer.surface_size();
        if !self.retired.is_empty() {
            let (layer, pixels) = self.retired.remove(0);
            texture.upload_layer(layer, &pixels, size);
            debug!("Atlas layer {} uploaded (retired)", layer);
            return;
        }
        texture.upload_layer(self.layer, self.rasterizer.surface(), size);
        self.dirty = false;
        debug!("Atlas layer {} uploaded: {} glyphs", self.layer, self.glyph_count);
    }

    /// Drop every cached glyph and start over at layer 0
    pub fn reset(&mut self) {
        self.cache.clear();
        self.retired.clear();
        self.rasterizer.fill_background();
        self.layer = 0;
        self.cursor_x = 0;
        self.cursor_y = 0;
        self.row_height = 0;
        self.rows = 1;
        self.glyph_count = 0;
        self.exhausted = false;
        self.dirty = true;
        info!("Glyph atlas reset");
    }

    pub fn stats(&self) -> AtlasStats {
        AtlasStats {
            layer: self.layer,
            rows: self.rows,
            glyphs: self.glyph_count,
            exhausted: self.exhausted,
        }
    }
}
