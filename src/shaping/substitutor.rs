//! GSUB lookup application
//!
//! Applies the lookups of the requested features to a glyph run, in
//! lookup-list order. Besides replacing glyph ids, every contextual or
//! ligature substitution stamps a [`SubstitutionEvent`] on the span of
//! glyphs it covered; the ligature grouper later turns runs of equal
//! events into render clusters.

use std::ops::RangeInclusive;

use log::debug;
use ttf_parser::gdef::Table as Gdef;
use ttf_parser::gsub::{ReverseChainSingleSubstitution, SingleSubstitution, SubstitutionSubtable};
use ttf_parser::opentype_layout::{
    ChainedContextLookup, ContextLookup, Coverage, LayoutTable, Lookup, Script, SequenceLookupRecord,
};
use ttf_parser::{GlyphId, LazyArray16, Tag};

use super::gdef::classify;
use super::glyph::{GlyphInfo, SubstitutionEvent};
use super::gsub;
use super::iterator::{GlyphIterator, IteratorOptions};
use crate::constants::MAX_NESTING_LEVEL;

/// Subtables of `lookup` that parse; unknown lookup types yield none
fn subtables<'t>(lookup: Lookup<'t>) -> impl Iterator<Item = SubstitutionSubtable<'t>> {
    (0..lookup.subtables.len()).filter_map(move |i| lookup.subtables.get::<SubstitutionSubtable>(i))
}

fn is_reverse(lookup: Lookup<'_>) -> bool {
    subtables(lookup).next().map_or(false, |s| s.is_reverse())
}

/// Every entry of an offset array, or `None` if one fails to parse
fn all_of<T>(len: u16, get: impl Fn(u16) -> Option<T>) -> Option<Vec<T>> {
    (0..len).map(get).collect()
}

fn covers(coverage: &Coverage<'_>, glyph: &GlyphInfo) -> bool {
    coverage.contains(GlyphId(glyph.id))
}

pub struct GlyphSubstitutor<'t> {
    gsub: LayoutTable<'t>,
    gdef: Option<Gdef<'t>>,
    script: Option<Script<'t>>,
    iterator: GlyphIterator<'t>,
    /// Features that enabled the lookup being applied
    current_features: Vec<Tag>,
    next_ligature_id: u32,
    next_event: u32,
}

impl<'t> GlyphSubstitutor<'t> {
    pub fn new(gsub: LayoutTable<'t>, gdef: Option<Gdef<'t>>) -> Self {
        Self {
            script: gsub::select_script(&gsub),
            gsub,
            gdef,
            iterator: GlyphIterator::new(),
            current_features: Vec::new(),
            next_ligature_id: 1,
            next_event: 1,
        }
    }

    #[inline]
    pub fn gsub(&self) -> &LayoutTable<'t> {
        &self.gsub
    }

    /// Script whose default language system drives substitution
    pub fn script(&self) -> Option<Script<'t>> {
        self.script
    }

    /// Apply every lookup the requested features enable
    pub fn apply_features(&mut self, features: &[Tag], glyphs: &mut Vec<GlyphInfo>) {
        let Some(script) = self.script else {
            return;
        };
        for glyph in glyphs.iter_mut() {
            glyph.classification = classify(glyph.id, &glyph.code_points, self.gdef.as_ref());
        }
        for (lookup_index, tags) in gsub::lookups_for(&self.gsub, &script, features) {
            self.current_features = tags;
            self.apply_lookup(lookup_index, glyphs);
        }
    }

    fn options_for(&self, lookup: &Lookup<'t>) -> IteratorOptions<'t> {
        let set = if lookup.flags.use_mark_filtering_set() {
            lookup.mark_filtering_set
        } else {
            None
        };
        IteratorOptions::new(lookup.flags).with_mark_filtering_set(set, self.gdef)
    }

    /// A glyph produced by a substitution, classified against the font
    fn new_glyph(&self, id: u16, code_points: Vec<char>, source: &GlyphInfo) -> GlyphInfo {
        let mut glyph = GlyphInfo::new(id, code_points, source.features.clone());
        glyph.classification = classify(id, &glyph.code_points, self.gdef.as_ref());
        glyph
    }

    fn apply_lookup(&mut self, lookup_index: u16, glyphs: &mut Vec<GlyphInfo>) {
        let Some(lookup) = self.gsub.lookups.get(lookup_index) else {
            return;
        };
        let options = self.options_for(&lookup);

        if is_reverse(lookup) {
            for index in (0..glyphs.len()).rev() {
                self.iterator.reset(options, index);
                self.apply_at_cursor(lookup, glyphs);
            }
            return;
        }

        // a match leaves the cursor on the last glyph it consumed
        self.iterator.reset(options, 0);
        while self.iterator.index() < glyphs.len() as isize {
            self.apply_at_cursor(lookup, glyphs);
            self.iterator.next(glyphs);
        }
    }

    fn apply_at_cursor(&mut self, lookup: Lookup<'t>, glyphs: &mut Vec<GlyphInfo>) -> bool {
        let Some(glyph) = self.iterator.cur(glyphs) else {
            return false;
        };
        if self.iterator.should_ignore(glyph)
            || !self.current_features.iter().any(|&t| glyph.has_feature(t))
        {
            return false;
        }
        for subtable in subtables(lookup) {
            if self.apply_subtable(subtable, glyphs, 0) {
                return true;
            }
        }
        false
    }

    /// Index of the cursor glyph; only called once `cur` is known to exist
    #[inline]
    fn cursor(&self) -> usize {
        self.iterator.index() as usize
    }

    fn apply_subtable(
        &mut self,
        subtable: SubstitutionSubtable<'t>,
        glyphs: &mut Vec<GlyphInfo>,
        nesting_level: usize,
    ) -> bool {
        let Some(glyph_id) = self.iterator.cur(glyphs).map(|g| g.id) else {
            return false;
        };
        let glyph = GlyphId(glyph_id);

        match subtable {
            SubstitutionSubtable::Single(single) => {
                let new_id = match single {
                    SingleSubstitution::Format1 { coverage, delta } => {
                        if !coverage.contains(glyph) {
                            return false;
                        }
                        // modulo 65536
                        (glyph_id as i32 + delta as i32) as u16
                    }
                    SingleSubstitution::Format2 {
                        coverage,
                        substitutes,
                    } => match coverage.get(glyph).and_then(|i| substitutes.get(i)) {
                        Some(id) => id.0,
                        None => return false,
                    },
                };
                let index = self.cursor();
                self.replace_glyph(&mut glyphs[index], new_id);
                true
            }

            SubstitutionSubtable::Multiple(multiple) => {
                let Some(sequence) = multiple
                    .coverage
                    .get(glyph)
                    .and_then(|i| multiple.sequences.get(i))
                else {
                    return false;
                };
                let ids: Vec<u16> = sequence.substitutes.into_iter().map(|g| g.0).collect();
                self.apply_multiple(&ids, glyphs);
                true
            }

            SubstitutionSubtable::Alternate(alternate) => {
                let alt = alternate
                    .coverage
                    .get(glyph)
                    .and_then(|i| alternate.alternate_sets.get(i))
                    .and_then(|set| set.alternates.get(0));
                match alt {
                    Some(id) => {
                        let index = self.cursor();
                        self.replace_glyph(&mut glyphs[index], id.0);
                        true
                    }
                    None => false,
                }
            }

            SubstitutionSubtable::Ligature(ligature) => {
                let Some(set) = ligature
                    .coverage
                    .get(glyph)
                    .and_then(|i| ligature.ligature_sets.get(i))
                else {
                    return false;
                };
                for lig in (0..set.len()).filter_map(|i| set.get(i)) {
                    let components: Vec<u16> = lig.components.into_iter().map(|g| g.0).collect();
                    let matched = self
                        .iterator
                        .match_forward(glyphs, 1, &components, |&c, g| c == g.id);
                    if let Some(matched) = matched {
                        self.apply_ligature(lig.glyph.0, &matched, glyphs);
                        return true;
                    }
                }
                false
            }

            SubstitutionSubtable::Context(context) => self.apply_context(context, glyph, glyphs, nesting_level),
            SubstitutionSubtable::ChainContext(chain) => {
                self.apply_chain_context(chain, glyph, glyphs, nesting_level)
            }
            SubstitutionSubtable::ReverseChainSingle(reverse) => self.apply_reverse_chain(reverse, glyph, glyphs),
        }
    }

    /// Swap a glyph id and reclassify it against the new id
    fn replace_glyph(&self, glyph: &mut GlyphInfo, id: u16) {
        glyph.id = id;
        glyph.classification = classify(id, &glyph.code_points, self.gdef.as_ref());
        glyph.substituted = true;
    }

    fn apply_multiple(&mut self, sequence: &[u16], glyphs: &mut Vec<GlyphInfo>) {
        let index = self.cursor();

        if sequence.is_empty() {
            // Deletion: the code points move to a neighbour so the source
            // text stays covered.
            let removed = glyphs.remove(index);
            let recipient = if index > 0 {
                Some(index - 1)
            } else if index < glyphs.len() {
                Some(index)
            } else {
                None
            };
            if let Some(r) = recipient {
                if r < index {
                    glyphs[r].code_points.extend(removed.code_points);
                } else {
                    let mut code_points = removed.code_points;
                    code_points.append(&mut glyphs[r].code_points);
                    glyphs[r].code_points = code_points;
                }
                if let Some(event) = removed.context_group {
                    self.merge_events(glyphs, r..=r, Some(event));
                }
            }
            self.iterator.set_index(index as isize - 1);
            return;
        }

        let source = glyphs[index].clone();
        self.replace_glyph(&mut glyphs[index], sequence[0]);

        for (offset, &id) in sequence.iter().enumerate().skip(1) {
            let mut inserted = self.new_glyph(id, Vec::new(), &source);
            inserted.is_ligated = source.is_ligated;
            inserted.ligature_component = source.ligature_component;
            inserted.substituted = true;
            glyphs.insert(index + offset, inserted);
        }

        let last = index + sequence.len() - 1;
        if last > index {
            self.stamp(glyphs, index..=last);
        }
        // the inserted glyphs are output, not input for this lookup
        self.iterator.set_index(last as isize);
    }

    fn apply_ligature(&mut self, ligature_glyph: u16, matched: &[usize], glyphs: &mut Vec<GlyphInfo>) {
        let index = self.cursor();
        let last = matched.last().copied().unwrap_or(index);
        let event = self.stamp(glyphs, index..=last);

        let cur = &glyphs[index];
        let mut code_points = cur.code_points.clone();
        for &m in matched {
            code_points.extend_from_slice(&glyphs[m].code_points);
        }

        let is_mark_ligature = cur.is_mark() && matched.iter().all(|&m| glyphs[m].is_mark());
        let mut ligature = self.new_glyph(ligature_glyph, code_points, cur);
        ligature.is_ligated = true;
        ligature.substituted = true;
        ligature.context_group = Some(event);
        ligature.ligature_id = if is_mark_ligature {
            None
        } else {
            let id = self.next_ligature_id;
            self.next_ligature_id += 1;
            Some(id)
        };

        // Glyphs skipped between components (marks, usually) attach to the
        // ligature component they followed.
        let mut last_ligature_id = cur.ligature_id;
        let mut last_component_count = cur.code_points.len().max(1) as u16;
        let mut component_count = last_component_count;
        let mut idx = index + 1;
        for &m in matched {
            if is_mark_ligature {
                idx = m;
            } else {
                while idx < m {
                    let component = component_count - last_component_count
                        + glyphs[idx].ligature_component.max(1).min(last_component_count);
                    glyphs[idx].ligature_id = ligature.ligature_id;
                    glyphs[idx].ligature_component = component;
                    idx += 1;
                }
            }
            last_ligature_id = glyphs[idx].ligature_id;
            last_component_count = glyphs[idx].code_points.len().max(1) as u16;
            component_count += last_component_count;
            idx += 1;
        }

        if last_ligature_id.is_some() && !is_mark_ligature {
            for glyph in glyphs.iter_mut().skip(idx) {
                if glyph.ligature_id != last_ligature_id {
                    break;
                }
                glyph.ligature_component = component_count - last_component_count
                    + glyph.ligature_component.max(1).min(last_component_count);
            }
        }

        for &m in matched.iter().rev() {
            glyphs.remove(m);
        }
        glyphs[index] = ligature;
    }

    // ------------------------------------------------------------------------
    // Contextual lookups
    // ------------------------------------------------------------------------

    fn apply_context(
        &mut self,
        context: ContextLookup<'t>,
        glyph: GlyphId,
        glyphs: &mut Vec<GlyphInfo>,
        nesting_level: usize,
    ) -> bool {
        let index = self.cursor();
        match context {
            ContextLookup::Format1 { coverage, sets } => {
                let Some(rules) = coverage.get(glyph).and_then(|i| sets.get(i)) else {
                    return false;
                };
                for rule in (0..rules.len()).filter_map(|i| rules.get(i)) {
                    let input: Vec<u16> = rule.input.into_iter().collect();
                    if let Some(matched) = self.iterator.match_forward(glyphs, 1, &input, |&id, g| id == g.id) {
                        let end = matched.last().copied().unwrap_or(index);
                        return self.apply_lookup_records(rule.lookups, index..=end, end, glyphs, nesting_level);
                    }
                }
                false
            }
            ContextLookup::Format2 {
                coverage,
                classes,
                sets,
            } => {
                if !coverage.contains(glyph) {
                    return false;
                }
                let Some(rules) = sets.get(classes.get(glyph)) else {
                    return false;
                };
                for rule in (0..rules.len()).filter_map(|i| rules.get(i)) {
                    let input: Vec<u16> = rule.input.into_iter().collect();
                    if let Some(matched) = self.iterator.match_forward(glyphs, 1, &input, |&class, g| {
                        class == classes.get(GlyphId(g.id))
                    }) {
                        let end = matched.last().copied().unwrap_or(index);
                        return self.apply_lookup_records(rule.lookups, index..=end, end, glyphs, nesting_level);
                    }
                }
                false
            }
            ContextLookup::Format3 {
                coverage,
                coverages,
                lookups,
            } => {
                if !coverage.contains(glyph) {
                    return false;
                }
                let Some(rest) = all_of(coverages.len(), |i| coverages.get(i)) else {
                    return false;
                };
                match self.iterator.match_forward(glyphs, 1, &rest, covers) {
                    Some(matched) => {
                        let end = matched.last().copied().unwrap_or(index);
                        self.apply_lookup_records(lookups, index..=end, end, glyphs, nesting_level)
                    }
                    None => false,
                }
            }
        }
    }

    fn apply_chain_context(
        &mut self,
        chain: ChainedContextLookup<'t>,
        glyph: GlyphId,
        glyphs: &mut Vec<GlyphInfo>,
        nesting_level: usize,
    ) -> bool {
        match chain {
            ChainedContextLookup::Format1 { coverage, sets } => {
                let Some(rules) = coverage.get(glyph).and_then(|i| sets.get(i)) else {
                    return false;
                };
                let by_id = |&id: &u16, g: &GlyphInfo| id == g.id;
                for rule in (0..rules.len()).filter_map(|i| rules.get(i)) {
                    let backtrack: Vec<u16> = rule.backtrack.into_iter().collect();
                    let input: Vec<u16> = rule.input.into_iter().collect();
                    let lookahead: Vec<u16> = rule.lookahead.into_iter().collect();
                    let matched = self.match_chain(glyphs, &backtrack, &input, &lookahead, by_id, by_id, by_id);
                    if let Some((span, input_end)) = matched {
                        return self.apply_lookup_records(rule.lookups, span, input_end, glyphs, nesting_level);
                    }
                }
                false
            }
            ChainedContextLookup::Format2 {
                coverage,
                backtrack_classes,
                input_classes,
                lookahead_classes,
                sets,
            } => {
                if !coverage.contains(glyph) {
                    return false;
                }
                let Some(rules) = sets.get(input_classes.get(glyph)) else {
                    return false;
                };
                for rule in (0..rules.len()).filter_map(|i| rules.get(i)) {
                    let backtrack: Vec<u16> = rule.backtrack.into_iter().collect();
                    let input: Vec<u16> = rule.input.into_iter().collect();
                    let lookahead: Vec<u16> = rule.lookahead.into_iter().collect();
                    let matched = self.match_chain(
                        glyphs,
                        &backtrack,
                        &input,
                        &lookahead,
                        |&c, g: &GlyphInfo| c == backtrack_classes.get(GlyphId(g.id)),
                        |&c, g: &GlyphInfo| c == input_classes.get(GlyphId(g.id)),
                        |&c, g: &GlyphInfo| c == lookahead_classes.get(GlyphId(g.id)),
                    );
                    if let Some((span, input_end)) = matched {
                        return self.apply_lookup_records(rule.lookups, span, input_end, glyphs, nesting_level);
                    }
                }
                false
            }
            ChainedContextLookup::Format3 {
                coverage,
                backtrack_coverages,
                input_coverages,
                lookahead_coverages,
                lookups,
            } => {
                if !coverage.contains(glyph) {
                    return false;
                }
                let (Some(backtrack), Some(input), Some(lookahead)) = (
                    all_of(backtrack_coverages.len(), |i| backtrack_coverages.get(i)),
                    all_of(input_coverages.len(), |i| input_coverages.get(i)),
                    all_of(lookahead_coverages.len(), |i| lookahead_coverages.get(i)),
                ) else {
                    return false;
                };
                match self.match_chain(glyphs, &backtrack, &input, &lookahead, covers, covers, covers) {
                    Some((span, input_end)) => {
                        self.apply_lookup_records(lookups, span, input_end, glyphs, nesting_level)
                    }
                    None => false,
                }
            }
        }
    }

    /// Match backtrack, input and lookahead around the cursor.
    ///
    /// The cursor glyph was already matched by the subtable coverage, so
    /// `input` holds only the glyphs after it. Returns the glyph span
    /// covered by the whole context and the index of the last input glyph.
    #[allow(clippy::too_many_arguments)]
    fn match_chain<T>(
        &mut self,
        glyphs: &[GlyphInfo],
        backtrack: &[T],
        input: &[T],
        lookahead: &[T],
        backtrack_match: impl FnMut(&T, &GlyphInfo) -> bool,
        input_match: impl FnMut(&T, &GlyphInfo) -> bool,
        lookahead_match: impl FnMut(&T, &GlyphInfo) -> bool,
    ) -> Option<(RangeInclusive<usize>, usize)> {
        let index = self.cursor();
        let input_indices = self.iterator.match_forward(glyphs, 1, input, input_match)?;
        let back = self.iterator.match_backward(glyphs, backtrack, backtrack_match)?;
        let lookahead_start = input.len() as isize + 1;
        let ahead = self
            .iterator
            .match_forward(glyphs, lookahead_start, lookahead, lookahead_match)?;

        let input_end = input_indices.last().copied().unwrap_or(index);
        let start = back.last().copied().unwrap_or(index);
        let end = ahead.last().copied().unwrap_or(input_end);
        Some((start..=end, input_end))
    }

    fn apply_reverse_chain(
        &mut self,
        reverse: ReverseChainSingleSubstitution<'t>,
        glyph: GlyphId,
        glyphs: &mut Vec<GlyphInfo>,
    ) -> bool {
        let Some(substitute) = reverse.coverage.get(glyph).and_then(|i| reverse.substitutes.get(i)) else {
            return false;
        };
        let backtrack_coverages = reverse.backtrack_coverages;
        let lookahead_coverages = reverse.lookahead_coverages;
        let (Some(backtrack), Some(lookahead)) = (
            all_of(backtrack_coverages.len(), |i| backtrack_coverages.get(i)),
            all_of(lookahead_coverages.len(), |i| lookahead_coverages.get(i)),
        ) else {
            return false;
        };
        let Some((span, _)) = self.match_chain(glyphs, &backtrack, &[], &lookahead, covers, covers, covers) else {
            return false;
        };
        let index = self.cursor();
        self.replace_glyph(&mut glyphs[index], substitute.0);
        if span.start() != span.end() {
            self.stamp(glyphs, span);
        }
        true
    }

    /// Apply nested lookups at their sequence positions, then leave the
    /// outer cursor on the last input glyph
    fn apply_lookup_records(
        &mut self,
        records: LazyArray16<'t, SequenceLookupRecord>,
        span: RangeInclusive<usize>,
        input_end: usize,
        glyphs: &mut Vec<GlyphInfo>,
        nesting_level: usize,
    ) -> bool {
        let options = self.iterator.options();
        let index = self.cursor();

        if records.is_empty() {
            // "ignore" rule: matches and stops the lookup without changing anything
            self.iterator.reset(options, input_end);
            return true;
        }
        self.stamp(glyphs, span);

        let len_before = glyphs.len();
        if nesting_level >= MAX_NESTING_LEVEL {
            debug!("nested lookups deeper than {} skipped", MAX_NESTING_LEVEL);
        } else {
            for record in records {
                self.iterator.reset(options, index);
                if self
                    .iterator
                    .increment(glyphs, record.sequence_index as isize)
                    .is_none()
                {
                    continue;
                }
                let Some(lookup) = self.gsub.lookups.get(record.lookup_list_index) else {
                    continue;
                };
                let position = self.cursor();
                let nested = self.options_for(&lookup);
                self.iterator.reset(nested, position);
                for subtable in subtables(lookup) {
                    if self.apply_subtable(subtable, glyphs, nesting_level + 1) {
                        break;
                    }
                }
            }
        }

        // nested multiple substitutions and ligatures move the input end
        let end = input_end as isize + glyphs.len() as isize - len_before as isize;
        self.iterator.reset(options, end.max(index as isize) as usize);
        true
    }

    // ------------------------------------------------------------------------
    // Substitution events
    // ------------------------------------------------------------------------

    fn new_event(&mut self) -> SubstitutionEvent {
        let event = SubstitutionEvent(self.next_event);
        self.next_event += 1;
        event
    }

    /// Stamp a fresh event on `span`, folding in any event already present
    /// on it so overlapping substitutions end up in one cluster
    fn stamp(&mut self, glyphs: &mut [GlyphInfo], span: RangeInclusive<usize>) -> SubstitutionEvent {
        self.merge_events(glyphs, span, None)
    }

    fn merge_events(
        &mut self,
        glyphs: &mut [GlyphInfo],
        span: RangeInclusive<usize>,
        extra: Option<SubstitutionEvent>,
    ) -> SubstitutionEvent {
        let event = self.new_event();
        if glyphs.is_empty() {
            return event;
        }
        let start = (*span.start()).min(glyphs.len() - 1);
        let end = (*span.end()).min(glyphs.len() - 1);

        let mut absorbed: Vec<SubstitutionEvent> =
            glyphs[start..=end].iter().filter_map(|g| g.context_group).collect();
        absorbed.extend(extra);

        for glyph in glyphs.iter_mut() {
            if glyph.context_group.map_or(false, |e| absorbed.contains(&e)) {
                glyph.context_group = Some(event);
            }
        }
        for glyph in &mut glyphs[start..=end] {
            glyph.context_group = Some(event);
        }
        event
    }
}
