//! Lookup-flag-aware cursor over a glyph run
//!
//! The cursor never owns the glyphs: every movement takes the current run,
//! because substitutions resize it between moves.

use ttf_parser::gdef::Table as Gdef;
use ttf_parser::opentype_layout::LookupFlags;
use ttf_parser::GlyphId;

use super::glyph::GlyphInfo;

/// Mark attachment class a lookup is restricted to (0 = any)
#[inline]
pub fn mark_attachment_type(flags: LookupFlags) -> u16 {
    // LookupFlags::mark_attachment_type drops the high byte in ttf-parser 0.20
    flags.0 >> 8
}

/// Which glyphs the cursor steps over
#[derive(Clone, Copy)]
pub struct IteratorOptions<'a> {
    pub flags: LookupFlags,
    /// GDEF mark glyph set index, when the lookup uses one
    pub mark_filtering_set: Option<u16>,
    pub gdef: Option<Gdef<'a>>,
}

impl Default for IteratorOptions<'_> {
    fn default() -> Self {
        Self::new(LookupFlags(0))
    }
}

impl<'a> IteratorOptions<'a> {
    pub fn new(flags: LookupFlags) -> Self {
        Self {
            flags,
            mark_filtering_set: None,
            gdef: None,
        }
    }

    pub fn with_mark_filtering_set(mut self, set: Option<u16>, gdef: Option<Gdef<'a>>) -> Self {
        self.mark_filtering_set = set;
        self.gdef = gdef;
        self
    }
}

#[derive(Clone, Default)]
pub struct GlyphIterator<'a> {
    options: IteratorOptions<'a>,
    index: isize,
}

impl<'a> GlyphIterator<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self, options: IteratorOptions<'a>, index: usize) {
        self.options = options;
        self.index = index as isize;
    }

    #[inline]
    pub fn options(&self) -> IteratorOptions<'a> {
        self.options
    }

    /// Raw position; may sit one step outside the run after a failed move
    #[inline]
    pub fn index(&self) -> isize {
        self.index
    }

    #[inline]
    pub fn set_index(&mut self, index: isize) {
        self.index = index;
    }

    pub fn should_ignore(&self, glyph: &GlyphInfo) -> bool {
        let flags = self.options.flags;
        let class = &glyph.classification;

        if flags.ignore_marks() && class.is_mark {
            return true;
        }
        if flags.ignore_base_glyphs() && class.is_base {
            return true;
        }
        if flags.ignore_ligatures() && class.is_ligature {
            return true;
        }

        let mark_type = mark_attachment_type(flags);
        if mark_type != 0 && class.is_mark && class.mark_attachment_type != mark_type {
            return true;
        }

        match self.options.mark_filtering_set {
            Some(set) if class.is_mark => !self
                .options
                .gdef
                .map_or(false, |gdef| gdef.is_mark_glyph(GlyphId(glyph.id), Some(set))),
            _ => false,
        }
    }

    pub fn cur<'g>(&self, glyphs: &'g [GlyphInfo]) -> Option<&'g GlyphInfo> {
        if self.index < 0 {
            return None;
        }
        glyphs.get(self.index as usize)
    }

    /// One step in `dir`, skipping ignored glyphs
    fn step<'g>(&mut self, glyphs: &'g [GlyphInfo], dir: isize) -> Option<&'g GlyphInfo> {
        let len = glyphs.len() as isize;
        self.index += dir;
        while self.index >= 0
            && self.index < len
            && self.should_ignore(&glyphs[self.index as usize])
        {
            self.index += dir;
        }
        self.cur(glyphs)
    }

    pub fn next<'g>(&mut self, glyphs: &'g [GlyphInfo]) -> Option<&'g GlyphInfo> {
        self.step(glyphs, 1)
    }

    pub fn prev<'g>(&mut self, glyphs: &'g [GlyphInfo]) -> Option<&'g GlyphInfo> {
        self.step(glyphs, -1)
    }

    /// Move `count` non-ignored glyphs (negative = backwards)
    pub fn increment<'g>(&mut self, glyphs: &'g [GlyphInfo], count: isize) -> Option<&'g GlyphInfo> {
        let dir = count.signum();
        for _ in 0..count.unsigned_abs() {
            self.step(glyphs, dir)?;
        }
        self.cur(glyphs)
    }

    /// Glyph `count` steps away, without moving
    pub fn peek<'g>(&mut self, glyphs: &'g [GlyphInfo], count: isize) -> Option<&'g GlyphInfo> {
        let saved = self.index;
        let glyph = self.increment(glyphs, count);
        self.index = saved;
        glyph
    }

    /// Index `count` steps away, without moving
    pub fn peek_index(&mut self, glyphs: &[GlyphInfo], count: isize) -> Option<usize> {
        let saved = self.index;
        let found = self.increment(glyphs, count).map(|_| self.index as usize);
        self.index = saved;
        found
    }

    /// Match `sequence` forward from `start` steps past the cursor.
    /// Returns the matched glyph indices; the cursor is left unchanged.
    pub fn match_forward<T>(
        &mut self,
        glyphs: &[GlyphInfo],
        start: isize,
        sequence: &[T],
        mut matches: impl FnMut(&T, &GlyphInfo) -> bool,
    ) -> Option<Vec<usize>> {
        let saved = self.index;
        let mut matched = Vec::with_capacity(sequence.len());
        let mut current = self.increment(glyphs, start);
        for item in sequence {
            match current {
                Some(glyph) if matches(item, glyph) => {
                    matched.push(self.index as usize);
                    current = self.next(glyphs);
                }
                _ => {
                    self.index = saved;
                    return None;
                }
            }
        }
        self.index = saved;
        Some(matched)
    }

    /// Match `sequence` backward from the cursor, `sequence[0]` nearest
    pub fn match_backward<T>(
        &mut self,
        glyphs: &[GlyphInfo],
        sequence: &[T],
        mut matches: impl FnMut(&T, &GlyphInfo) -> bool,
    ) -> Option<Vec<usize>> {
        let saved = self.index;
        let mut matched = Vec::with_capacity(sequence.len());
        for item in sequence {
            match self.prev(glyphs) {
                Some(glyph) if matches(item, glyph) => matched.push(self.index as usize),
                _ => {
                    self.index = saved;
                    return None;
                }
            }
        }
        self.index = saved;
        Some(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaping::test_support::{coverage_format1, gdef_table};
    use std::rc::Rc;

    const IGNORE_MARKS: LookupFlags = LookupFlags(0x0008);

    fn run(text: &str) -> Vec<GlyphInfo> {
        let features: Rc<[_]> = Rc::from(Vec::new());
        text.chars()
            .enumerate()
            .map(|(i, c)| GlyphInfo::new(i as u16 + 1, vec![c], features.clone()))
            .collect()
    }

    #[test]
    fn test_next_skips_marks() {
        let glyphs = run("a\u{301}b");
        let mut it = GlyphIterator::new();
        it.reset(IteratorOptions::new(IGNORE_MARKS), 0);

        let next = it.next(&glyphs).unwrap();
        assert_eq!(next.code_points, vec!['b']);
        assert_eq!(it.index(), 2);
        assert!(it.next(&glyphs).is_none());
    }

    #[test]
    fn test_no_flags_visits_every_glyph() {
        let glyphs = run("a\u{301}b");
        let mut it = GlyphIterator::new();
        it.reset(IteratorOptions::default(), 0);
        assert_eq!(it.next(&glyphs).unwrap().code_points, vec!['\u{301}']);
        assert_eq!(it.prev(&glyphs).unwrap().code_points, vec!['a']);
        assert!(it.prev(&glyphs).is_none());
        assert_eq!(it.index(), -1);
    }

    #[test]
    fn test_peek_and_increment() {
        let glyphs = run("ab\u{301}cd");
        let mut it = GlyphIterator::new();
        it.reset(IteratorOptions::new(IGNORE_MARKS), 1);

        assert_eq!(it.peek(&glyphs, 1).unwrap().code_points, vec!['c']);
        assert_eq!(it.peek_index(&glyphs, 2), Some(4));
        assert_eq!(it.peek_index(&glyphs, -1), Some(0));
        assert_eq!(it.index(), 1);

        assert_eq!(it.increment(&glyphs, 2).unwrap().code_points, vec!['d']);
        assert!(it.increment(&glyphs, 5).is_none());
    }

    #[test]
    fn test_mark_filtering_set() {
        let bytes = gdef_table(None, None, vec![coverage_format1(&[3])]).to_bytes();
        let gdef = Gdef::parse(&bytes).unwrap();

        let glyphs = run("a\u{301}\u{300}b");
        let options = IteratorOptions::new(LookupFlags(0x0010)).with_mark_filtering_set(Some(0), Some(gdef));
        let mut it = GlyphIterator::new();
        it.reset(options, 0);
        // glyph 2 (U+0301) is outside the set and skipped; glyph 3 is kept
        assert_eq!(it.next(&glyphs).unwrap().id, 3);
    }

    #[test]
    fn test_mark_attachment_type_in_high_byte() {
        let flags = LookupFlags(0x0308);
        assert!(flags.ignore_marks());
        assert_eq!(mark_attachment_type(flags), 3);
    }

    #[test]
    fn test_match_forward_and_backward() {
        let glyphs = run("ab\u{301}c");
        let mut it = GlyphIterator::new();
        it.reset(IteratorOptions::new(IGNORE_MARKS), 0);

        let matched = it.match_forward(&glyphs, 1, &['b', 'c'], |c, g| g.code_points == [*c]);
        assert_eq!(matched, Some(vec![1, 3]));
        assert_eq!(it.index(), 0);
        assert!(it
            .match_forward(&glyphs, 1, &['c'], |c, g| g.code_points == [*c])
            .is_none());

        it.reset(IteratorOptions::new(IGNORE_MARKS), 3);
        let back = it.match_backward(&glyphs, &['b', 'a'], |c, g| g.code_points == [*c]);
        assert_eq!(back, Some(vec![1, 0]));
        assert_eq!(it.index(), 3);
    }
}
