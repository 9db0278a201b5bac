//! OpenType glyph substitution
//!
//! GSUB/GDEF lookups over the tables ttf-parser exposes. It only
//! substitutes glyphs and records which glyphs were substituted together;
//! positioning (GPOS) is left to the monospace grid.

pub mod gdef;
pub mod glyph;
pub mod gsub;
pub mod iterator;
pub mod substitutor;
pub mod tables;

#[cfg(test)]
pub(crate) mod test_support;

pub use gdef::{classify, Classification};
pub use glyph::{GlyphInfo, SubstitutionEvent};
pub use iterator::{GlyphIterator, IteratorOptions};
pub use substitutor::GlyphSubstitutor;
pub use tables::ShapingTables;
pub use ttf_parser::Tag;
