//! GDEF glyph classification
//!
//! Glyph classes and mark attachment classes come from the font's GDEF
//! table when it has a glyph class definition; otherwise they are derived
//! from the glyph's code points.

use ttf_parser::gdef::{GlyphClass, Table as Gdef};
use ttf_parser::GlyphId;
use unicode_normalization::char::is_combining_mark;

/// Glyph role used by lookup-flag skipping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classification {
    pub is_base: bool,
    pub is_ligature: bool,
    pub is_mark: bool,
    pub mark_attachment_type: u16,
}

/// Classify a glyph
///
/// With a GDEF glyph class table the font decides. Without one, a glyph is
/// a mark when all its code points are combining marks, a ligature when it
/// carries more than one code point, and a base otherwise.
pub fn classify(glyph_id: u16, code_points: &[char], gdef: Option<&Gdef>) -> Classification {
    match gdef.filter(|g| g.has_glyph_classes()) {
        Some(gdef) => {
            let glyph = GlyphId(glyph_id);
            let class = gdef.glyph_class(glyph);
            Classification {
                is_base: class == Some(GlyphClass::Base),
                is_ligature: class == Some(GlyphClass::Ligature),
                is_mark: class == Some(GlyphClass::Mark),
                mark_attachment_type: gdef.glyph_mark_attachment_class(glyph),
            }
        }
        None => {
            let is_mark = !code_points.is_empty() && code_points.iter().all(|&c| is_combining_mark(c));
            Classification {
                is_base: !is_mark,
                is_ligature: code_points.len() > 1,
                is_mark,
                mark_attachment_type: 0,
            }
        }
    }
}
