//! Ligature grouping
//!
//! Turns a run of cell characters into render clusters: a cluster is either
//! one cell or several cells the font draws as one ligature. Positions stay
//! on the cell grid; only the grouping changes.

use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, info, warn};
use smol_str::SmolStr;

use super::face::{FontFace, GlyphMapper};
use crate::constants::LIGATURE_FEATURES;
use crate::shaping::{GlyphInfo, ShapingTables, SubstitutionEvent, Tag};

pub trait LigatureGrouper {
    /// Group `characters` (one entry per cell) into render clusters.
    /// Concatenating the output always yields the concatenated input.
    fn ligature_groups(&mut self, characters: &[SmolStr]) -> Vec<SmolStr>;
}

/// Grouper for fonts without usable ligatures
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLigatureGrouper;

impl LigatureGrouper for NoopLigatureGrouper {
    fn ligature_groups(&mut self, characters: &[SmolStr]) -> Vec<SmolStr> {
        characters.to_vec()
    }
}

/// Grouper driven by the font's GSUB ligature features
pub struct ShapingLigatureGrouper<M> {
    mapper: M,
    tables: ShapingTables,
    features: Rc<[Tag]>,
    /// Keyed by the concatenated run; never evicted
    cache: HashMap<String, Vec<SmolStr>>,
    shape_count: usize,
}

impl<M: GlyphMapper> ShapingLigatureGrouper<M> {
    /// `None` when the font offers none of the ligature features
    pub fn new(mapper: M, tables: ShapingTables) -> Option<Self> {
        let wanted: Vec<Tag> = LIGATURE_FEATURES.iter().map(|t| Tag::from_bytes(t)).collect();
        let features = tables.supported_features(&wanted);
        if features.is_empty() {
            return None;
        }
        Some(Self {
            mapper,
            tables,
            features: features.into(),
            cache: HashMap::new(),
            shape_count: 0,
        })
    }

    /// Ligature features this font provides
    pub fn features(&self) -> &[Tag] {
        &self.features
    }

    /// Number of runs that went through the shaping engine
    pub fn shape_count(&self) -> usize {
        self.shape_count
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    fn shape(&mut self, characters: &[SmolStr]) -> Vec<SmolStr> {
        let mut glyphs: Vec<GlyphInfo> = characters
            .iter()
            .flat_map(|c| c.chars())
            .map(|c| GlyphInfo::new(self.mapper.glyph_index(c), vec![c], self.features.clone()))
            .collect();

        self.tables.substitute(&self.features, &mut glyphs);
        self.shape_count += 1;

        align_to_cells(characters, &cluster_sizes(&glyphs))
    }
}

impl<M: GlyphMapper> LigatureGrouper for ShapingLigatureGrouper<M> {
    fn ligature_groups(&mut self, characters: &[SmolStr]) -> Vec<SmolStr> {
        let key: String = characters.iter().map(SmolStr::as_str).collect();
        if let Some(groups) = self.cache.get(&key) {
            return groups.clone();
        }
        let groups = self.shape(characters);
        debug!("ligature groups for {:?}: {:?}", key, groups);
        self.cache.insert(key, groups.clone());
        groups
    }
}

/// Code-point count of each cluster: consecutive glyphs sharing a
/// substitution event form one cluster, every other glyph its own
fn cluster_sizes(glyphs: &[GlyphInfo]) -> Vec<usize> {
    let mut sizes: Vec<usize> = Vec::new();
    let mut prev: Option<SubstitutionEvent> = None;
    for glyph in glyphs {
        let n = glyph.code_points.len();
        match (glyph.context_group, sizes.last_mut()) {
            (Some(event), Some(last)) if prev == Some(event) => *last += n,
            _ => sizes.push(n),
        }
        prev = glyph.context_group;
    }
    sizes
}

/// Rebuild clusters from the source cells.
///
/// A cluster boundary that falls inside a multi-code-point cell is dropped,
/// so every output string is a concatenation of whole input cells.
fn align_to_cells(characters: &[SmolStr], cluster_sizes: &[usize]) -> Vec<SmolStr> {
    let mut boundaries = Vec::with_capacity(cluster_sizes.len());
    let mut offset = 0;
    for &size in cluster_sizes {
        offset += size;
        boundaries.push(offset);
    }

    let mut groups = Vec::new();
    let mut current = String::new();
    let mut consumed = 0;
    for cell in characters {
        current.push_str(cell);
        consumed += cell.chars().count();
        if boundaries.binary_search(&consumed).is_ok() {
            groups.push(SmolStr::new(&current));
            current.clear();
        }
    }
    if !current.is_empty() {
        groups.push(SmolStr::new(&current));
    }
    groups
}

/// Number of input cells each output cluster covers
pub fn cell_spans(characters: &[SmolStr], groups: &[SmolStr]) -> Vec<usize> {
    let mut cells = characters.iter();
    groups
        .iter()
        .map(|group| {
            let mut len = 0;
            let mut count = 0;
            while len < group.len() {
                match cells.next() {
                    Some(cell) => {
                        len += cell.len();
                        count += 1;
                    }
                    None => break,
                }
            }
            count.max(1)
        })
        .collect()
}

/// Build the grouper for `family` (name or path).
///
/// Any failure degrades to the no-op grouper for the rest of the session.
pub fn create_ligature_grouper(family: &str) -> Box<dyn LigatureGrouper> {
    let face = match FontFace::load(family) {
        Ok(face) => face,
        Err(e) => {
            warn!("Ligatures disabled for \"{}\": {:#}", family, e);
            return Box::new(NoopLigatureGrouper);
        }
    };
    grouper_for_face(face)
}

pub fn grouper_for_face(face: FontFace) -> Box<dyn LigatureGrouper> {
    let FontFace { name, font, tables } = face;
    match ShapingLigatureGrouper::new(font, tables) {
        Some(grouper) => {
            info!(
                "Ligatures enabled for \"{}\": {}",
                name,
                grouper
                    .features()
                    .iter()
                    .map(Tag::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            Box::new(grouper)
        }
        None => {
            info!("\"{}\" has no ligature features", name);
            Box::new(NoopLigatureGrouper)
        }
    }
}

/// One grouper per font family, created on first use
pub struct LigatureGroupers {
    enabled: bool,
    groupers: HashMap<String, Box<dyn LigatureGrouper>>,
}

impl LigatureGroupers {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            groupers: HashMap::new(),
        }
    }

    /// Register a grouper built elsewhere (tests, preloaded faces)
    pub fn insert(&mut self, family: &str, grouper: Box<dyn LigatureGrouper>) {
        self.groupers.insert(family.to_string(), grouper);
    }

    pub fn for_family(&mut self, family: &str) -> &mut dyn LigatureGrouper {
        let enabled = self.enabled;
        self.groupers
            .entry(family.to_string())
            .or_insert_with(|| {
                if enabled {
                    create_ligature_grouper(family)
                } else {
                    Box::new(NoopLigatureGrouper)
                }
            })
            .as_mut()
    }

    pub fn len(&self) -> usize {
        self.groupers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groupers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaping::test_support::{arrow_calt_gsub, arrow_ligature_gsub, char_to_gid, sfnt, Node};

    fn cells(text: &str) -> Vec<SmolStr> {
        text.chars().map(|c| SmolStr::new(c.to_string())).collect()
    }

    fn grouper(gsub: Node) -> ShapingLigatureGrouper<fn(char) -> u16> {
        let font = sfnt(&[(b"GSUB", gsub.to_bytes())]);
        let tables = ShapingTables::parse(&font, 0).unwrap();
        ShapingLigatureGrouper::new(char_to_gid as fn(char) -> u16, tables).unwrap()
    }

    #[test]
    fn test_arrow_ligature_is_cached() {
        let mut g = grouper(arrow_calt_gsub());
        let input = cells("->");

        assert_eq!(g.ligature_groups(&input), vec![SmolStr::new("->")]);
        assert_eq!(g.shape_count(), 1);
        assert_eq!(g.ligature_groups(&input), vec![SmolStr::new("->")]);
        assert_eq!(g.shape_count(), 1);
        assert_eq!(g.cache_len(), 1);
    }

    #[test]
    fn test_ligature_lookup_groups_within_run() {
        let mut g = grouper(arrow_ligature_gsub());
        assert_eq!(
            g.ligature_groups(&cells("a->=")),
            vec![SmolStr::new("a"), SmolStr::new("->"), SmolStr::new("=")]
        );
        assert_eq!(g.features(), &[Tag::from_bytes(b"liga")]);
    }

    #[test]
    fn test_output_concatenates_to_input() {
        let mut g = grouper(arrow_calt_gsub());
        let input = cells("a->b->->c");
        let groups = g.ligature_groups(&input);
        let joined: String = groups.iter().map(SmolStr::as_str).collect();
        assert_eq!(joined, "a->b->->c");
        assert_eq!(groups.iter().filter(|g| g.as_str() == "->").count(), 3);
    }

    #[test]
    fn test_font_without_ligature_features_is_rejected() {
        let font = sfnt(&[]);
        let tables = ShapingTables::parse(&font, 0).unwrap();
        assert!(ShapingLigatureGrouper::new(char_to_gid as fn(char) -> u16, tables).is_none());
    }

    #[test]
    fn test_noop_passthrough() {
        let input = cells("->==");
        assert_eq!(NoopLigatureGrouper.ligature_groups(&input), input);
    }

    #[test]
    fn test_cluster_inside_cell_is_widened() {
        // one cell holds "e" + combining acute; a cluster boundary after "e"
        // cannot split it
        let input = vec![SmolStr::new("e\u{301}"), SmolStr::new("x")];
        let groups = align_to_cells(&input, &[1, 1, 1]);
        assert_eq!(groups, vec![SmolStr::new("e\u{301}"), SmolStr::new("x")]);
    }

    #[test]
    fn test_cell_spans() {
        let input = cells("a->b");
        let groups = vec![SmolStr::new("a"), SmolStr::new("->"), SmolStr::new("b")];
        assert_eq!(cell_spans(&input, &groups), vec![1, 2, 1]);

        let wide = vec![SmolStr::new("e\u{301}"), SmolStr::new("=")];
        assert_eq!(cell_spans(&wide, &wide), vec![1, 1]);
    }

    #[test]
    fn test_registry_reuses_grouper_and_honours_disable() {
        let mut registry = LigatureGroupers::new(false);
        assert!(registry.is_empty());
        let input = cells("->");
        assert_eq!(registry.for_family("Any Mono").ligature_groups(&input), input);
        registry.for_family("Any Mono");
        assert_eq!(registry.len(), 1);

        registry.insert("Arrow", Box::new(grouper(arrow_calt_gsub())));
        assert_eq!(
            registry.for_family("Arrow").ligature_groups(&input),
            vec![SmolStr::new("->")]
        );
        assert_eq!(registry.len(), 2);
    }
}
