//! Atlas texture array
//!
//! One RGBA8 `TEXTURE_2D_ARRAY`; the glyph atlas writes whole layers.

use anyhow::{anyhow, Result};
use glow::HasContext;
use log::{debug, info, warn};

use crate::font::atlas::AtlasTexture;

pub struct GlTextureArray {
    texture: glow::Texture,
    size: u32,
    layers: u32,
}

impl GlTextureArray {
    /// Allocate `layers` empty layers of `size`x`size` pixels
    pub fn new(gl: &glow::Context, size: u32, layers: u32) -> Result<Self> {
        let texture = unsafe {
            let tex = gl
                .create_texture()
                .map_err(|e| anyhow!("Failed to create texture: {}", e))?;

            gl.bind_texture(glow::TEXTURE_2D_ARRAY, Some(tex));
            gl.tex_image_3d(
                glow::TEXTURE_2D_ARRAY,
                0,
                glow::RGBA8 as i32,
                size as i32,
                size as i32,
                layers as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                None,
            );

            // No mipmaps: glyphs are drawn at 1:1
            gl.tex_parameter_i32(glow::TEXTURE_2D_ARRAY, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D_ARRAY, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D_ARRAY, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D_ARRAY, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);

            gl.bind_texture(glow::TEXTURE_2D_ARRAY, None);
            tex
        };

        info!("Atlas texture array created: {} layers of {}x{}", layers, size, size);
        Ok(Self { texture, size, layers })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn layers(&self) -> u32 {
        self.layers
    }

    /// Bind texture
    pub fn bind(&self, gl: &glow::Context, unit: u32) {
        unsafe {
            gl.active_texture(glow::TEXTURE0 + unit);
            gl.bind_texture(glow::TEXTURE_2D_ARRAY, Some(self.texture));
        }
    }

    /// Upload target for [`GlyphAtlas::upload_texture`](crate::font::atlas::GlyphAtlas::upload_texture)
    pub fn uploader<'a>(&'a self, gl: &'a glow::Context) -> LayerUploader<'a> {
        LayerUploader { gl, texture: self }
    }

    /// Release resources
    pub fn destroy(&self, gl: &glow::Context) {
        unsafe {
            gl.delete_texture(self.texture);
        }
    }
}

/// A texture array paired with the context it lives in
pub struct LayerUploader<'a> {
    gl: &'a glow::Context,
    texture: &'a GlTextureArray,
}

impl AtlasTexture for LayerUploader<'_> {
    fn upload_layer(&mut self, layer: u32, pixels: &[u8], size: u32) {
        if layer >= self.texture.layers || size != self.texture.size {
            warn!(
                "Atlas layer {} ({}px) does not fit texture array ({} layers of {}px)",
                layer,
                size,
                self.texture.layers,
                self.texture.size
            );
            return;
        }
        unsafe {
            self.gl.bind_texture(glow::TEXTURE_2D_ARRAY, Some(self.texture.texture));
            self.gl.tex_sub_image_3d(
                glow::TEXTURE_2D_ARRAY,
                0,
                0,
                0,
                layer as i32,
                size as i32,
                size as i32,
                1,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(pixels),
            );
            self.gl.bind_texture(glow::TEXTURE_2D_ARRAY, None);
        }
        debug!("Atlas layer {} uploaded ({} bytes)", layer, pixels.len());
    }
}
