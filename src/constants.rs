//! Global constants for gridglyph
//!
//! Consolidates font feature, atlas and rendering constants
//! to eliminate magic numbers throughout the codebase.

// ============================================================================
// OpenType Features
// ============================================================================

/// Ligature features applied by the shaping engine, in application order
pub const LIGATURE_FEATURES: [&[u8; 4]; 5] = [b"calt", b"rclt", b"liga", b"dlig", b"clig"];

/// Scripts tried (in order) when selecting GSUB script tables
pub const PREFERRED_SCRIPTS: [&[u8; 4]; 3] = [b"DFLT", b"dflt", b"latn"];

/// Maximum depth of nested lookups applied from contextual rules
pub const MAX_NESTING_LEVEL: usize = 64;

// ============================================================================
// Atlas Constants
// ============================================================================

/// Default atlas layer edge length in device pixels
pub const DEFAULT_TEXTURE_SIZE: u32 = 1024;

/// Default number of texture array layers
pub const DEFAULT_TEXTURE_LAYERS: u32 = 4;

/// Default number of sub-pixel horizontal variants per glyph
pub const DEFAULT_VARIANT_COUNT: u32 = 3;

/// Default padding around each rasterized glyph (logical pixels)
pub const DEFAULT_GLYPH_PADDING: u32 = 2;

/// Italic shear factor for synthetic italics (tan 12°)
pub const SYNTHETIC_ITALIC_SHEAR: f32 = 0.21;

/// Minimum font size (pixels)
pub const MIN_FONT_SIZE: f32 = 6.0;

/// Maximum font size (pixels)
pub const MAX_FONT_SIZE: f32 = 96.0;

// ============================================================================
// Rendering Constants
// ============================================================================

/// Maximum glyph instances per draw batch
pub const MAX_GLYPH_INSTANCES: usize = 32768;

/// Maximum solid quad instances per draw batch
pub const MAX_SOLID_INSTANCES: usize = 32768;

/// Underline thickness relative to cell height
pub const UNDERLINE_THICKNESS_SCALE: f32 = 0.06;

/// Underline position below baseline, relative to descent
pub const UNDERLINE_POSITION_SCALE: f32 = 0.5;
