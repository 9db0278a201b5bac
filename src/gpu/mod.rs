//! GPU rendering with OpenGL ES
//!
//! Handles:
//! - GLSL ES 3.00 quad programs (solid, two-pass text, single-pass text)
//! - Atlas texture array uploads
//! - Instance batching and the per-frame draw sequence
//!
//! The caller owns the GL context and the window; nothing here creates one.

pub mod batch;
pub mod renderer;
pub mod shader;
pub mod texture;

pub use batch::{CellMetrics, FrameBatch, FrameTheme, GlyphInstance, SolidInstance};
pub use renderer::GridRenderer;
pub use shader::{viewport_scale, QuadShader, ShaderKind};
pub use texture::GlTextureArray;
