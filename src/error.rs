//! Domain errors
//!
//! Setup plumbing uses `anyhow`; the conditions callers must be able to
//! match on are typed here.

use thiserror::Error;

/// Unusable font data or OpenType layout table
///
/// Always recoverable: the ligature loader logs it and falls back to
/// no-op grouping.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShapingError {
    #[error("cannot read font: {0}")]
    Face(#[from] ttf_parser::FaceParsingError),
    #[error("{0} table is present but malformed")]
    MalformedTable(&'static str),
}

/// Glyph atlas failure
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AtlasError {
    /// Every texture layer is full. Existing allocations cannot shrink,
    /// so the atlas must be rebuilt with more (or larger) layers.
    #[error(
        "glyph atlas exhausted: all {layers} texture layers of {texture_size}x{texture_size} px are full"
    )]
    TextureSpaceExhausted { layers: u32, texture_size: u32 },
}

/// Renderer-level failure surfaced to the owner of the renderer
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(
        "{0}; increase atlas.layer_count or atlas.texture_size in the config and recreate the renderer"
    )]
    AtlasExhausted(#[from] AtlasError),
    #[error(transparent)]
    Gpu(#[from] anyhow::Error),
}
