//! Fakes for atlas and renderer tests

use super::atlas::AtlasTexture;
use super::rasterizer::{FontStyle, GlyphRasterizer};

/// 8 px per character, 16 px lines; records every call
pub struct FakeRasterizer {
    size: u32,
    surface: Vec<u8>,
    pub fills: usize,
    pub draws: Vec<(String, FontStyle, (f32, f32))>,
}

impl FakeRasterizer {
    pub fn new(size: u32) -> Self {
        Self {
            size,
            surface: vec![0; (size * size * 4) as usize],
            fills: 0,
            draws: Vec::new(),
        }
    }
}

impl GlyphRasterizer for FakeRasterizer {
    fn measure(&mut self, text: &str, _style: FontStyle) -> f32 {
        8.0 * text.chars().count() as f32
    }

    fn line_height(&self) -> f32 {
        16.0
    }

    fn fill_background(&mut self) {
        self.fills += 1;
        self.surface.fill(0);
    }

    fn rasterize(&mut self, text: &str, style: FontStyle, origin: (f32, f32)) {
        self.draws.push((text.to_string(), style, origin));
    }

    fn surface(&self) -> &[u8] {
        &self.surface
    }

    fn surface_size(&self) -> u32 {
        self.size
    }
}

/// Records `(layer, byte count, size)` per upload
#[derive(Default)]
pub struct FakeTexture {
    pub uploads: Vec<(u32, usize, u32)>,
}

impl AtlasTexture for FakeTexture {
    fn upload_layer(&mut self, layer: u32, pixels: &[u8], size: u32) {
        self.uploads.push((layer, pixels.len(), size));
    }
}
