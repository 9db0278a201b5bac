//! Grid renderer
//!
//! Owns the GL objects of the pipeline: quad programs, instance buffers
//! and the atlas texture array. One `draw_frame` call lays out the grid,
//! flushes new glyphs to the texture and issues the instanced draws.

use anyhow::{anyhow, Result};
use glow::HasContext;
use log::info;

use super::batch::{
    as_bytes, CellMetrics, FrameBatch, FrameTheme, GlyphInstance, SolidInstance, GLYPH_INSTANCE_FLOATS,
    SOLID_INSTANCE_FLOATS,
};
use super::shader::{viewport_scale, QuadShader, ShaderKind};
use super::texture::GlTextureArray;
use crate::config::{RenderConfig, RenderMode};
use crate::constants::{MAX_GLYPH_INSTANCES, MAX_SOLID_INSTANCES};
use crate::error::RenderError;
use crate::font::atlas::{AtlasSettings, GlyphAtlas};
use crate::font::ligature::LigatureGrouper;
use crate::font::rasterizer::GlyphRasterizer;
use crate::grid::CellSource;

/// Instance buffer with its attribute layout
struct InstanceBuffer {
    vao: glow::VertexArray,
    vbo: glow::Buffer,
    capacity: usize,
}

impl InstanceBuffer {
    /// `attributes`: (location, component count) in buffer order
    fn new(gl: &glow::Context, attributes: &[(u32, i32)], floats: usize, capacity: usize) -> Result<Self> {
        unsafe {
            let vao = gl
                .create_vertex_array()
                .map_err(|e| anyhow!("Failed to create VAO: {}", e))?;
            gl.bind_vertex_array(Some(vao));

            let vbo = gl
                .create_buffer()
                .map_err(|e| anyhow!("Failed to create VBO: {}", e))?;
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.buffer_data_size(glow::ARRAY_BUFFER, (capacity * floats * 4) as i32, glow::DYNAMIC_DRAW);

            let stride = (floats * 4) as i32;
            let mut offset = 0;
            for &(location, size) in attributes {
                gl.enable_vertex_attrib_array(location);
                gl.vertex_attrib_pointer_f32(location, size, glow::FLOAT, false, stride, offset);
                gl.vertex_attrib_divisor(location, 1); // per-instance
                offset += size * 4;
            }

            gl.bind_vertex_array(None);
            Ok(Self { vao, vbo, capacity })
        }
    }

    /// Upload and draw, splitting into chunks of at most `capacity`
    fn draw<T: Copy>(&self, gl: &glow::Context, instances: &[T]) {
        if instances.is_empty() {
            return;
        }
        unsafe {
            gl.bind_vertex_array(Some(self.vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.vbo));
            for chunk in instances.chunks(self.capacity) {
                gl.buffer_sub_data_u8_slice(glow::ARRAY_BUFFER, 0, as_bytes(chunk));
                // 4 vertices per instance (triangle strip)
                gl.draw_arrays_instanced(glow::TRIANGLE_STRIP, 0, 4, chunk.len() as i32);
            }
            gl.bind_vertex_array(None);
        }
    }

    fn destroy(&self, gl: &glow::Context) {
        unsafe {
            gl.delete_vertex_array(self.vao);
            gl.delete_buffer(self.vbo);
        }
    }
}

/// Text grid renderer
pub struct GridRenderer {
    solid_shader: QuadShader,
    coverage_shader: QuadShader,
    color_shader: QuadShader,
    premultiplied_shader: QuadShader,
    solids: InstanceBuffer,
    glyphs: InstanceBuffer,
    texture: GlTextureArray,
    mode: RenderMode,
    theme: FrameTheme,
    device_pixel_ratio: f32,
    batch: FrameBatch,
}

impl GridRenderer {
    /// Compile the programs and allocate buffers and the atlas texture
    pub fn new(
        gl: &glow::Context,
        atlas: &AtlasSettings,
        config: &RenderConfig,
        metrics: CellMetrics,
    ) -> Result<Self> {
        let solid_shader = QuadShader::new(gl, ShaderKind::Solid)?;
        let coverage_shader = QuadShader::new(gl, ShaderKind::Coverage)?;
        let color_shader = QuadShader::new(gl, ShaderKind::Color)?;
        let premultiplied_shader = QuadShader::new(gl, ShaderKind::Premultiplied)?;

        // a_rect, a_color
        let solids = InstanceBuffer::new(gl, &[(0, 4), (1, 4)], SOLID_INSTANCE_FLOATS, MAX_SOLID_INSTANCES)?;
        // a_rect, a_tex_rect, a_layer, a_color
        let glyphs = InstanceBuffer::new(
            gl,
            &[(0, 4), (1, 4), (2, 1), (3, 4)],
            GLYPH_INSTANCE_FLOATS,
            MAX_GLYPH_INSTANCES,
        )?;
        let texture = GlTextureArray::new(gl, atlas.texture_size, atlas.layer_count)?;

        info!("Grid renderer initialized ({:?})", config.mode);
        Ok(Self {
            solid_shader,
            coverage_shader,
            color_shader,
            premultiplied_shader,
            solids,
            glyphs,
            texture,
            mode: config.mode,
            theme: FrameTheme::from_config(config),
            device_pixel_ratio: atlas.device_pixel_ratio,
            batch: FrameBatch::new(metrics),
        })
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: RenderMode) {
        self.mode = mode;
    }

    pub fn set_metrics(&mut self, metrics: CellMetrics) {
        self.batch.set_metrics(metrics);
    }

    /// Instances of the last frame
    pub fn batch(&self) -> &FrameBatch {
        &self.batch
    }

    /// Draw the visible grid into the current framebuffer
    ///
    /// `viewport` is in device pixels. Atlas exhaustion aborts the frame and
    /// cannot be recovered without rebuilding the atlas.
    pub fn draw_frame<S, R>(
        &mut self,
        gl: &glow::Context,
        source: &S,
        grouper: &mut dyn LigatureGrouper,
        atlas: &mut GlyphAtlas<R>,
        viewport: (u32, u32),
        cursor: Option<(usize, usize)>,
    ) -> Result<(), RenderError>
    where
        S: CellSource + ?Sized,
        R: GlyphRasterizer,
    {
        self.batch.build_frame(source, grouper, atlas, &self.theme, cursor)?;
        let mut uploader = self.texture.uploader(gl);
        while atlas.is_dirty() {
            atlas.upload_texture(&mut uploader);
        }

        let (width, height) = viewport;
        let scale = viewport_scale(
            width as f32 / self.device_pixel_ratio,
            height as f32 / self.device_pixel_ratio,
        );
        let [r, g, b, a] = self.theme.background;

        unsafe {
            gl.viewport(0, 0, width as i32, height as i32);
            gl.clear_color(r, g, b, a);
            gl.clear(glow::COLOR_BUFFER_BIT);
            gl.enable(glow::BLEND);

            gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
            self.draw_solids(gl, &self.batch.backgrounds, scale);

            self.texture.bind(gl, 0);
            match self.mode {
                RenderMode::TwoPass => {
                    gl.blend_func(glow::ZERO, glow::ONE_MINUS_SRC_COLOR);
                    self.draw_glyphs(gl, &self.coverage_shader, &self.batch.glyphs, scale);
                    gl.blend_func(glow::ONE, glow::ONE);
                    self.draw_glyphs(gl, &self.color_shader, &self.batch.glyphs, scale);
                }
                RenderMode::SinglePass => {
                    gl.blend_func(glow::ONE, glow::ONE_MINUS_SRC_ALPHA);
                    self.draw_glyphs(gl, &self.premultiplied_shader, &self.batch.glyphs, scale);
                }
            }

            gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
            self.draw_solids(gl, &self.batch.overlays, scale);

            let error = gl.get_error();
            if error != glow::NO_ERROR {
                return Err(RenderError::Gpu(anyhow!("GL error 0x{:04X} while drawing frame", error)));
            }
        }
        Ok(())
    }

    fn draw_solids(&self, gl: &glow::Context, instances: &[SolidInstance], scale: [f32; 2]) {
        if instances.is_empty() {
            return;
        }
        self.solid_shader.bind(gl);
        self.solid_shader.set_viewport_scale(gl, scale);
        self.solids.draw(gl, instances);
    }

    fn draw_glyphs(&self, gl: &glow::Context, shader: &QuadShader, instances: &[GlyphInstance], scale: [f32; 2]) {
        if instances.is_empty() {
            return;
        }
        shader.bind(gl);
        shader.set_viewport_scale(gl, scale);
        shader.set_atlas_unit(gl, 0);
        self.glyphs.draw(gl, instances);
    }

    /// Release resources
    pub fn destroy(&self, gl: &glow::Context) {
        self.solids.destroy(gl);
        self.glyphs.destroy(gl);
        self.texture.destroy(gl);
        self.solid_shader.destroy(gl);
        self.coverage_shader.destroy(gl);
        self.color_shader.destroy(gl);
        self.premultiplied_shader.destroy(gl);
    }
}
