//! Font loading, ligature grouping and the glyph atlas
//!
//! Handles:
//! - Font discovery (fontconfig) and loading (fontdue)
//! - Ligature clusters from the font's GSUB features
//! - CPU rasterization with synthetic styles and sub-pixel variants
//! - Glyph atlas packing into a texture array

pub mod atlas;
pub mod face;
pub mod fontconfig;
pub mod ligature;
pub mod rasterizer;

#[cfg(test)]
pub(crate) mod test_support;

pub use atlas::{AtlasSettings, AtlasStats, AtlasTexture, GlyphAtlas, RasterizedGlyph};
pub use face::{FontFace, GlyphMapper, StyledFonts};
pub use fontconfig::{resolve_font, resolve_font_path, FontFinder};
pub use ligature::{
    cell_spans, create_ligature_grouper, LigatureGrouper, LigatureGroupers, NoopLigatureGrouper,
    ShapingLigatureGrouper,
};
pub use rasterizer::{FontStyle, FontdueRasterizer, GlyphRasterizer};
