//! Hierarchy fallback stage.
//!
//! Entities without an exact match inherit the targets of their nearest
//! exactly matched ancestor: levels are searched in order and the walk
//! stops at the first level with at least one matched ancestor, keeping
//! every tie at that level. Entities that do have an exact match are
//! additionally refined with matched children, which sharpens precision
//! for broad classes without replacing the concept-level match.

use std::collections::HashMap;

use tracing::info;

use crate::{
    hierarchy::HierarchyCatalog,
    matching::record::{MatchLevel, MatchRecord},
};

/// Output of the hierarchy fallback stage.
#[derive(Debug, Default)]
pub struct HierarchyMatches {
    pub ancestor: Vec<MatchRecord>,
    pub child: Vec<MatchRecord>,
    /// Entities that had no matched ancestor at any level; they continue
    /// to the similarity stage and are counted in run statistics.
    pub no_hierarchy: Vec<String>,
}

/// Exact records grouped by their ontology source id.
pub fn group_by_source(records: Vec<&MatchRecord>) -> HashMap<String, Vec<&MatchRecord>> {
    let mut grouped: HashMap<String, Vec<&MatchRecord>> = HashMap::new();
    for record in records {
        grouped.entry(record.source_id.clone()).or_default().push(record);
    }
    grouped
}

/// Search ancestors for unmatched entities and children for matched ones.
pub fn match_hierarchy(
    unmatched: &[String],
    matched: &[String],
    catalog: &HierarchyCatalog,
    exact_by_source: &HashMap<String, Vec<&MatchRecord>>,
) -> HierarchyMatches {
    let mut out = HierarchyMatches::default();

    for entity in unmatched {
        let Some(index) = catalog.ancestors.get(entity) else {
            out.no_hierarchy.push(entity.clone());
            continue;
        };
        let mut found = false;
        for (level, relatives) in index {
            let mut level_records = Vec::new();
            for relative in relatives {
                if let Some(records) = exact_by_source.get(relative) {
                    for exact in records {
                        level_records.push(inherit(
                            entity,
                            exact,
                            MatchLevel::Ancestor,
                            relative,
                            *level,
                        ));
                    }
                }
            }
            if !level_records.is_empty() {
                // nearest level wins; ties at the same level are all kept
                out.ancestor.append(&mut level_records);
                found = true;
                break;
            }
        }
        if !found {
            out.no_hierarchy.push(entity.clone());
        }
    }

    for entity in matched {
        let Some(index) = catalog.children.get(entity) else {
            continue;
        };
        for (level, relatives) in index {
            let mut level_records = Vec::new();
            for relative in relatives {
                if let Some(records) = exact_by_source.get(relative) {
                    for exact in records {
                        level_records.push(inherit(
                            entity,
                            exact,
                            MatchLevel::Child,
                            relative,
                            *level,
                        ));
                    }
                }
            }
            if !level_records.is_empty() {
                out.child.append(&mut level_records);
                break;
            }
        }
    }

    info!(
        ancestor = out.ancestor.len(),
        child = out.child.len(),
        unmatched = out.no_hierarchy.len(),
        "hierarchy fallback stage finished"
    );
    out
}

fn inherit(
    entity: &str,
    exact: &MatchRecord,
    level: MatchLevel,
    relative: &str,
    distance: usize,
) -> MatchRecord {
    let mut evidence = exact.evidence.clone();
    evidence.insert(format!("{}:{relative} level:{distance}", level.as_str()));
    MatchRecord {
        source_id: entity.to_string(),
        target_id: exact.target_id.clone(),
        match_level: level,
        match_types: exact.match_types.clone(),
        evidence,
        score: None,
    }
}
