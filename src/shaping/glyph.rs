//! Glyph run entries

use std::rc::Rc;

use ttf_parser::Tag;

use super::gdef::{classify, Classification};

/// Token shared by every glyph that took part in one contextual or
/// ligature substitution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubstitutionEvent(pub u32);

/// One glyph of a run being shaped
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphInfo {
    pub id: u16,
    /// Source code points this glyph stands for (empty for glyphs inserted
    /// by a multiple substitution)
    pub code_points: Vec<char>,
    pub features: Rc<[Tag]>,
    /// Unicode-derived until the substitutor reclassifies the run against
    /// the font's GDEF
    pub classification: Classification,
    pub ligature_id: Option<u32>,
    /// 0 = not a ligature component
    pub ligature_component: u16,
    pub is_ligated: bool,
    pub substituted: bool,
    pub context_group: Option<SubstitutionEvent>,
}

impl GlyphInfo {
    pub fn new(id: u16, code_points: Vec<char>, features: Rc<[Tag]>) -> Self {
        let classification = classify(id, &code_points, None);
        Self {
            id,
            code_points,
            features,
            classification,
            ligature_id: None,
            ligature_component: 0,
            is_ligated: false,
            substituted: false,
            context_group: None,
        }
    }

    #[inline]
    pub fn has_feature(&self, tag: Tag) -> bool {
        self.features.contains(&tag)
    }

    #[inline]
    pub fn is_mark(&self) -> bool {
        self.classification.is_mark
    }

    #[inline]
    pub fn is_base(&self) -> bool {
        self.classification.is_base
    }

    #[inline]
    pub fn is_ligature(&self) -> bool {
        self.classification.is_ligature
    }
}
