//! The per-font shaping tables
//!
//! Layout tables borrow the font bytes, so the bytes are kept here and a
//! [`Face`] is parsed again whenever the tables are consulted.

use std::fmt;
use std::rc::Rc;

use log::warn;
use ttf_parser::{Face, Tag};

use super::glyph::GlyphInfo;
use super::gsub;
use super::substitutor::GlyphSubstitutor;
use crate::error::ShapingError;

/// GSUB and GDEF of one font face
#[derive(Clone, Default)]
pub struct ShapingTables {
    /// `None` for fonts without a GSUB table
    data: Option<Rc<[u8]>>,
    collection_index: u32,
}

impl fmt::Debug for ShapingTables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapingTables")
            .field("bytes", &self.data.as_ref().map_or(0, |d| d.len()))
            .field("collection_index", &self.collection_index)
            .finish()
    }
}

impl ShapingTables {
    pub fn parse(data: &[u8], collection_index: u32) -> Result<Self, ShapingError> {
        let face = Face::parse(data, collection_index)?;
        let raw = face.raw_face();
        let tables = face.tables();

        if raw.table(Tag::from_bytes(b"GDEF")).is_some() && tables.gdef.is_none() {
            warn!("GDEF ignored, falling back to Unicode classes");
        }
        if tables.gsub.is_none() {
            if raw.table(Tag::from_bytes(b"GSUB")).is_some() {
                return Err(ShapingError::MalformedTable("GSUB"));
            }
            return Ok(Self::default());
        }

        Ok(Self {
            data: Some(Rc::from(data)),
            collection_index,
        })
    }

    /// Run `f` over the font's GSUB substitutor
    fn with_substitutor<R>(&self, f: impl FnOnce(GlyphSubstitutor<'_>) -> R) -> Option<R> {
        let data = self.data.as_deref()?;
        let face = Face::parse(data, self.collection_index).ok()?;
        let tables = face.tables();
        let substitutor = GlyphSubstitutor::new(tables.gsub?, tables.gdef);
        Some(f(substitutor))
    }

    /// Tag of the script used for substitution
    pub fn script(&self) -> Option<Tag> {
        self.with_substitutor(|s| s.script().map(|script| script.tag))
            .flatten()
    }

    /// Feature tags the selected script offers
    pub fn available_features(&self) -> Vec<Tag> {
        self.with_substitutor(|s| match s.script() {
            Some(script) => gsub::feature_tags(s.gsub(), &script),
            None => Vec::new(),
        })
        .unwrap_or_default()
    }

    /// Subset of `wanted` this font actually provides
    pub fn supported_features(&self, wanted: &[Tag]) -> Vec<Tag> {
        let available = self.available_features();
        wanted
            .iter()
            .copied()
            .filter(|t| available.contains(t))
            .collect()
    }

    /// Run the lookups of `features` over `glyphs`
    pub fn substitute(&self, features: &[Tag], glyphs: &mut Vec<GlyphInfo>) {
        self.with_substitutor(|mut s| s.apply_features(features, glyphs));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaping::test_support::{arrow_ligature_gsub, gdef_table, sfnt, Node};
    use ttf_parser::FaceParsingError;

    fn tag(bytes: &[u8; 4]) -> Tag {
        Tag::from_bytes(bytes)
    }

    #[test]
    fn test_tables_of_single_font() {
        let font = sfnt(&[(b"GSUB", arrow_ligature_gsub().to_bytes())]);
        let tables = ShapingTables::parse(&font, 0).unwrap();
        assert_eq!(tables.script(), Some(tag(b"DFLT")));
        assert_eq!(
            tables.supported_features(&[tag(b"calt"), tag(b"liga")]),
            vec![tag(b"liga")]
        );
        assert_eq!(tables.available_features(), vec![tag(b"liga")]);
    }

    #[test]
    fn test_font_without_gsub_has_no_features() {
        let font = sfnt(&[]);
        let tables = ShapingTables::parse(&font, 0).unwrap();
        assert!(tables.script().is_none());
        assert!(tables.supported_features(&[tag(b"liga")]).is_empty());
    }

    #[test]
    fn test_malformed_gsub_is_an_error() {
        let font = sfnt(&[(b"GSUB", Node::new().u16(2).u16(0).to_bytes())]);
        assert_eq!(
            ShapingTables::parse(&font, 0).unwrap_err(),
            ShapingError::MalformedTable("GSUB")
        );
    }

    #[test]
    fn test_malformed_gdef_is_ignored() {
        let mut bad_gdef = gdef_table(None, None, Vec::new()).to_bytes();
        bad_gdef[0] = 9;
        let font = sfnt(&[(b"GDEF", bad_gdef), (b"GSUB", arrow_ligature_gsub().to_bytes())]);
        let tables = ShapingTables::parse(&font, 0).unwrap();
        assert_eq!(tables.available_features(), vec![tag(b"liga")]);
    }

    #[test]
    fn test_collection_index() {
        let inner = sfnt(&[(b"GSUB", arrow_ligature_gsub().to_bytes())]);
        // ttcf header with one font at offset 16; table offsets are
        // file-relative, so every record shifts by the header length
        let mut ttc = Vec::new();
        ttc.extend_from_slice(b"ttcf");
        ttc.extend_from_slice(&0x0001_0000u32.to_be_bytes());
        ttc.extend_from_slice(&1u32.to_be_bytes());
        ttc.extend_from_slice(&16u32.to_be_bytes());
        let mut shifted = inner.clone();
        let num_tables = u16::from_be_bytes([inner[4], inner[5]]) as usize;
        for record in 0..num_tables {
            let at = 12 + record * 16 + 8;
            let offset = u32::from_be_bytes([inner[at], inner[at + 1], inner[at + 2], inner[at + 3]]) + 16;
            shifted[at..at + 4].copy_from_slice(&offset.to_be_bytes());
        }
        ttc.extend_from_slice(&shifted);

        let tables = ShapingTables::parse(&ttc, 0).unwrap();
        assert_eq!(tables.available_features(), vec![tag(b"liga")]);
        assert_eq!(
            ShapingTables::parse(&ttc, 3).unwrap_err(),
            ShapingError::Face(FaceParsingError::FaceIndexOutOfBounds)
        );
    }

    #[test]
    fn test_rejects_non_font() {
        assert_eq!(
            ShapingTables::parse(b"PK\x03\x04....", 0).unwrap_err(),
            ShapingError::Face(FaceParsingError::UnknownMagic)
        );
    }
}
