//! GSUB script and feature selection
//!
//! Substitution always runs under the default language system of one
//! script; these helpers pick that script and resolve requested feature
//! tags to the lookups they enable.

use ttf_parser::opentype_layout::{LanguageSystem, LayoutTable, Script};
use ttf_parser::Tag;

use crate::constants::PREFERRED_SCRIPTS;

/// First preferred script the font defines, else its first script
pub fn select_script<'a>(gsub: &LayoutTable<'a>) -> Option<Script<'a>> {
    PREFERRED_SCRIPTS
        .iter()
        .find_map(|tag| {
            let tag = Tag::from_bytes(tag);
            gsub.scripts.into_iter().find(|s| s.tag == tag)
        })
        .or_else(|| gsub.scripts.get(0))
}

/// Required feature first, then the listed ones
fn feature_indices(lang_sys: LanguageSystem<'_>) -> impl Iterator<Item = u16> + '_ {
    lang_sys.required_feature.into_iter().chain(lang_sys.feature_indices)
}

/// Feature tags reachable from `script`'s default language system
pub fn feature_tags(gsub: &LayoutTable<'_>, script: &Script<'_>) -> Vec<Tag> {
    let mut tags: Vec<Tag> = script
        .default_language
        .into_iter()
        .flat_map(feature_indices)
        .filter_map(|i| gsub.features.get(i).map(|f| f.tag))
        .collect();
    tags.sort();
    tags.dedup();
    tags
}

/// Lookups enabled by `features` under `script`, in lookup-list order,
/// each paired with the feature tags that reference it
pub fn lookups_for(gsub: &LayoutTable<'_>, script: &Script<'_>, features: &[Tag]) -> Vec<(u16, Vec<Tag>)> {
    let Some(lang_sys) = script.default_language else {
        return Vec::new();
    };

    let mut selected: Vec<(u16, Vec<Tag>)> = Vec::new();
    for fi in feature_indices(lang_sys) {
        let Some(feature) = gsub.features.get(fi) else {
            continue;
        };
        if !features.contains(&feature.tag) {
            continue;
        }
        for li in feature.lookup_indices {
            if li >= gsub.lookups.len() {
                continue;
            }
            match selected.iter_mut().find(|(i, _)| *i == li) {
                Some((_, tags)) => {
                    if !tags.contains(&feature.tag) {
                        tags.push(feature.tag);
                    }
                }
                None => selected.push((li, vec![feature.tag])),
            }
        }
    }
    selected.sort_by_key(|(i, _)| *i);
    selected
}
