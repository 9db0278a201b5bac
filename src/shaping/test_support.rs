//! OpenType byte builder for tests
//!
//! A [`Node`] is one table or subtable: a list of scalar fields plus
//! offsets to child nodes. Serialization lays each node out as its header
//! followed by its children, with offsets relative to the containing node.

enum Field {
    U16(u16),
    U32(u32),
    Tag([u8; 4]),
    Offset16(Node),
    Offset32(Node),
}

#[derive(Default)]
pub struct Node {
    fields: Vec<Field>,
}

impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u16(mut self, v: u16) -> Self {
        self.fields.push(Field::U16(v));
        self
    }

    pub fn i16(self, v: i16) -> Self {
        self.u16(v as u16)
    }

    pub fn u32(mut self, v: u32) -> Self {
        self.fields.push(Field::U32(v));
        self
    }

    pub fn tag(mut self, tag: &[u8; 4]) -> Self {
        self.fields.push(Field::Tag(*tag));
        self
    }

    pub fn u16s(self, values: &[u16]) -> Self {
        values.iter().fold(self, |n, &v| n.u16(v))
    }

    pub fn offset16(mut self, child: Node) -> Self {
        self.fields.push(Field::Offset16(child));
        self
    }

    pub fn offset32(mut self, child: Node) -> Self {
        self.fields.push(Field::Offset32(child));
        self
    }

    /// Null offset when `child` is `None`
    pub fn optional_offset16(self, child: Option<Node>) -> Self {
        match child {
            Some(child) => self.offset16(child),
            None => self.u16(0),
        }
    }

    pub fn offsets16(self, children: Vec<Node>) -> Self {
        children.into_iter().fold(self, |n, c| n.offset16(c))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write(&mut out);
        out
    }

    fn write(&self, out: &mut Vec<u8>) {
        let start = out.len();
        let mut patches = Vec::new();
        for field in &self.fields {
            match field {
                Field::U16(v) => out.extend_from_slice(&v.to_be_bytes()),
                Field::U32(v) => out.extend_from_slice(&v.to_be_bytes()),
                Field::Tag(t) => out.extend_from_slice(t),
                Field::Offset16(child) => {
                    patches.push((out.len(), child, 2));
                    out.extend_from_slice(&[0, 0]);
                }
                Field::Offset32(child) => {
                    patches.push((out.len(), child, 4));
                    out.extend_from_slice(&[0, 0, 0, 0]);
                }
            }
        }
        for (pos, child, width) in patches {
            let offset = out.len() - start;
            child.write(out);
            if width == 2 {
                out[pos..pos + 2].copy_from_slice(&(offset as u16).to_be_bytes());
            } else {
                out[pos..pos + 4].copy_from_slice(&(offset as u32).to_be_bytes());
            }
        }
    }
}

pub fn coverage_format1(glyphs: &[u16]) -> Node {
    Node::new().u16(1).u16(glyphs.len() as u16).u16s(glyphs)
}

pub fn class_def_format1(start: u16, classes: &[u16]) -> Node {
    Node::new()
        .u16(1)
        .u16(start)
        .u16(classes.len() as u16)
        .u16s(classes)
}

pub fn class_def_format2(ranges: &[(u16, u16, u16)]) -> Node {
    ranges
        .iter()
        .fold(Node::new().u16(2).u16(ranges.len() as u16), |n, &(s, e, c)| {
            n.u16(s).u16(e).u16(c)
        })
}

// ============================================================================
// GDEF
// ============================================================================

/// GDEF 1.2; each mark glyph set is a format 1 coverage of its glyphs
pub fn gdef_table(glyph_classes: Option<Node>, mark_attach_classes: Option<Node>, mark_sets: Vec<Node>) -> Node {
    let mark_sets_def = (!mark_sets.is_empty()).then(|| {
        let count = mark_sets.len() as u16;
        mark_sets
            .into_iter()
            .fold(Node::new().u16(1).u16(count), |n, set| n.offset32(set))
    });
    Node::new()
        .u16(1)
        .u16(2)
        .optional_offset16(glyph_classes)
        .u16(0)
        .u16(0)
        .optional_offset16(mark_attach_classes)
        .optional_offset16(mark_sets_def)
}

// ============================================================================
// GSUB
// ============================================================================

/// GSUB 1.0 with one script whose default language uses every feature
pub fn gsub_table(script: &[u8; 4], features: &[(&[u8; 4], &[u16])], lookups: Vec<Node>) -> Node {
    let feature_indices: Vec<u16> = (0..features.len() as u16).collect();
    let lang_sys = Node::new()
        .u16(0)
        .u16(0xFFFF)
        .u16(feature_indices.len() as u16)
        .u16s(&feature_indices);
    let script_table = Node::new().offset16(lang_sys).u16(0);
    let script_list = Node::new().u16(1).tag(script).offset16(script_table);

    let mut feature_list = Node::new().u16(features.len() as u16);
    for (tag, lookup_indices) in features {
        let feature = Node::new()
            .u16(0)
            .u16(lookup_indices.len() as u16)
            .u16s(lookup_indices);
        feature_list = feature_list.tag(tag).offset16(feature);
    }

    let lookup_list = Node::new().u16(lookups.len() as u16).offsets16(lookups);

    Node::new()
        .u16(1)
        .u16(0)
        .offset16(script_list)
        .offset16(feature_list)
        .offset16(lookup_list)
}

pub fn lookup(lookup_type: u16, flags: u16, subtables: Vec<Node>) -> Node {
    Node::new()
        .u16(lookup_type)
        .u16(flags)
        .u16(subtables.len() as u16)
        .offsets16(subtables)
}

pub fn single_format1(glyphs: &[u16], delta: i16) -> Node {
    Node::new()
        .u16(1)
        .offset16(coverage_format1(glyphs))
        .i16(delta)
}

pub fn single_format2(pairs: &[(u16, u16)]) -> Node {
    let from: Vec<u16> = pairs.iter().map(|p| p.0).collect();
    let to: Vec<u16> = pairs.iter().map(|p| p.1).collect();
    Node::new()
        .u16(2)
        .offset16(coverage_format1(&from))
        .u16(to.len() as u16)
        .u16s(&to)
}

pub fn multiple_format1(rules: &[(u16, &[u16])]) -> Node {
    let from: Vec<u16> = rules.iter().map(|r| r.0).collect();
    let sequences = rules
        .iter()
        .map(|(_, seq)| Node::new().u16(seq.len() as u16).u16s(seq))
        .collect();
    Node::new()
        .u16(1)
        .offset16(coverage_format1(&from))
        .u16(rules.len() as u16)
        .offsets16(sequences)
}

pub fn alternate_format1(rules: &[(u16, &[u16])]) -> Node {
    // same layout as multiple substitution
    multiple_format1(rules)
}

/// Ligatures keyed by first glyph; each entry is (full component list, ligature glyph)
pub fn ligature_format1(ligatures: &[(&[u16], u16)]) -> Node {
    let mut firsts: Vec<u16> = ligatures.iter().map(|(c, _)| c[0]).collect();
    firsts.sort_unstable();
    firsts.dedup();
    let sets = firsts
        .iter()
        .map(|&first| {
            let ligs: Vec<Node> = ligatures
                .iter()
                .filter(|(c, _)| c[0] == first)
                .map(|(c, glyph)| Node::new().u16(*glyph).u16(c.len() as u16).u16s(&c[1..]))
                .collect();
            Node::new().u16(ligs.len() as u16).offsets16(ligs)
        })
        .collect();
    Node::new()
        .u16(1)
        .offset16(coverage_format1(&firsts))
        .u16(firsts.len() as u16)
        .offsets16(sets)
}

fn lookup_records(node: Node, records: &[(u16, u16)]) -> Node {
    records
        .iter()
        .fold(node, |n, &(seq, lookup)| n.u16(seq).u16(lookup))
}

fn coverages(node: Node, sets: &[&[u16]]) -> Node {
    sets.iter()
        .fold(node.u16(sets.len() as u16), |n, glyphs| {
            n.offset16(coverage_format1(glyphs))
        })
}

pub fn context_format3(input: &[&[u16]], records: &[(u16, u16)]) -> Node {
    let node = Node::new().u16(3).u16(input.len() as u16).u16(records.len() as u16);
    let node = input
        .iter()
        .fold(node, |n, glyphs| n.offset16(coverage_format1(glyphs)));
    lookup_records(node, records)
}

pub fn chain_context_format3(
    backtrack: &[&[u16]],
    input: &[&[u16]],
    lookahead: &[&[u16]],
    records: &[(u16, u16)],
) -> Node {
    let node = Node::new().u16(3);
    let node = coverages(node, backtrack);
    let node = coverages(node, input);
    let node = coverages(node, lookahead);
    lookup_records(node.u16(records.len() as u16), records)
}

pub fn extension(lookup_type: u16, subtable: Node) -> Node {
    Node::new().u16(1).u16(lookup_type).offset32(subtable)
}

pub fn reverse_chain_format1(
    pairs: &[(u16, u16)],
    backtrack: &[&[u16]],
    lookahead: &[&[u16]],
) -> Node {
    let from: Vec<u16> = pairs.iter().map(|p| p.0).collect();
    let to: Vec<u16> = pairs.iter().map(|p| p.1).collect();
    let node = Node::new().u16(1).offset16(coverage_format1(&from));
    let node = coverages(node, backtrack);
    let node = coverages(node, lookahead);
    node.u16(to.len() as u16).u16s(&to)
}

// ============================================================================
// Font files
// ============================================================================

/// Minimal sfnt holding `tables` plus the head, hhea and maxp tables
/// every face must have
pub fn sfnt(tables: &[(&[u8; 4], Vec<u8>)]) -> Vec<u8> {
    let mut head = vec![0u8; 54];
    head[0..4].copy_from_slice(&0x0001_0000u32.to_be_bytes());
    head[18..20].copy_from_slice(&1000u16.to_be_bytes());
    let hhea = vec![0u8; 36];
    let maxp = Node::new().u32(0x0000_5000).u16(0xFFFF).to_bytes();

    let mut all: Vec<(&[u8; 4], &[u8])> = vec![
        (b"head", head.as_slice()),
        (b"hhea", hhea.as_slice()),
        (b"maxp", maxp.as_slice()),
    ];
    all.extend(tables.iter().map(|(tag, data)| (*tag, data.as_slice())));
    // table records are binary searched by tag
    all.sort_by_key(|(tag, _)| **tag);

    let header_len = 12 + 16 * all.len();
    let mut out = Vec::new();
    out.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    out.extend_from_slice(&(all.len() as u16).to_be_bytes());
    out.extend_from_slice(&[0; 6]);
    let mut offset = header_len;
    for (tag, data) in &all {
        out.extend_from_slice(*tag);
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&(offset as u32).to_be_bytes());
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        offset += data.len();
    }
    for (_, data) in &all {
        out.extend_from_slice(data);
    }
    out
}

// Glyph ids shared by the fixtures below
pub const GID_HYPHEN: u16 = 1;
pub const GID_GREATER: u16 = 2;
pub const GID_EQUAL: u16 = 3;
pub const GID_A: u16 = 4;
pub const GID_ACUTE: u16 = 5;
pub const GID_HYPHEN_GREATER_LIGA: u16 = 10;

/// `-` `>` ligate to a single glyph under `liga`
pub fn arrow_ligature_gsub() -> Node {
    gsub_table(
        b"DFLT",
        &[(b"liga", &[0])],
        vec![lookup(
            4,
            0,
            vec![ligature_format1(&[(&[GID_HYPHEN, GID_GREATER], GID_HYPHEN_GREATER_LIGA)])],
        )],
    )
}

/// Contextual-alternates arrow: `-` `>` swap to two spacer glyphs via a
/// chain rule, the way coding fonts build wide ligatures under `calt`
pub fn arrow_calt_gsub() -> Node {
    gsub_table(
        b"DFLT",
        &[(b"calt", &[0])],
        vec![
            lookup(
                6,
                0,
                vec![chain_context_format3(
                    &[],
                    &[&[GID_HYPHEN], &[GID_GREATER]],
                    &[],
                    &[(0, 1), (1, 2)],
                )],
            ),
            lookup(1, 0, vec![single_format2(&[(GID_HYPHEN, 20)])]),
            lookup(1, 0, vec![single_format2(&[(GID_GREATER, 21)])]),
        ],
    )
}

pub fn char_to_gid(c: char) -> u16 {
    match c {
        '-' => GID_HYPHEN,
        '>' => GID_GREATER,
        '=' => GID_EQUAL,
        'a' => GID_A,
        '\u{301}' => GID_ACUTE,
        _ => 0,
    }
}
