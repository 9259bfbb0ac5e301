//! Result aggregation: precedence, evidence merging and run statistics.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::info;

use crate::{
    matching::exact::ExactMatches,
    matching::fallback::HierarchyMatches,
    matching::record::{MatchLevel, MatchRecord},
    model::entity::OntologyTable,
};

/// Per-pair counts surfaced in logs and the stats sidecar.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunStats {
    pub concept_matches: usize,
    pub ancestor_matches: usize,
    pub child_matches: usize,
    pub fuzzy_matches: usize,
    pub unmatched: usize,
    /// Entities that searched the hierarchy and found nothing.
    pub no_hierarchy: Vec<String>,
    /// Entities with no match at any tier.
    pub no_match: Vec<String>,
}

/// Final picture for one ontology entity. "No match" is an empty `matches`
/// map, never a missing entry, so consumers can tell "searched and failed"
/// from "never searched".
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedMapping {
    pub ontology_id: String,
    pub label: String,
    pub version: String,
    /// Merged records keyed by clinical target id.
    pub matches: IndexMap<String, Vec<MatchRecord>>,
}

impl ResolvedMapping {
    pub fn is_unmatched(&self) -> bool {
        self.matches.is_empty()
    }

    fn push(&mut self, record: MatchRecord) {
        let records = self.matches.entry(record.target_id.clone()).or_default();
        if let Some(existing) = records
            .iter_mut()
            .find(|r| r.match_level == record.match_level)
        {
            existing.absorb(&record);
        } else {
            records.push(record);
        }
    }
}

/// Merge stage outputs into one `ResolvedMapping` per ontology entity.
///
/// Precedence per entity, highest first: `concept` (any exact type) >
/// `child` (additive) > `ancestor` > `fuzzy`. An entity with a concept
/// match never receives ancestor or fuzzy records; child records only
/// attach alongside an existing concept match. Every input entity appears
/// in the output exactly once.
pub fn aggregate(
    ontology: &OntologyTable,
    exact: &ExactMatches,
    hierarchy: &HierarchyMatches,
    fuzzy: &[MatchRecord],
) -> (IndexMap<String, ResolvedMapping>, RunStats) {
    let mut by_source: HashMap<String, Vec<&MatchRecord>> = HashMap::new();
    for record in exact
        .iter()
        .chain(&hierarchy.ancestor)
        .chain(&hierarchy.child)
        .chain(fuzzy)
    {
        by_source
            .entry(record.source_id.clone())
            .or_default()
            .push(record);
    }

    let mut stats = RunStats {
        no_hierarchy: hierarchy.no_hierarchy.clone(),
        ..RunStats::default()
    };
    let mut resolved: IndexMap<String, ResolvedMapping> = IndexMap::new();

    for class in ontology.classes.values() {
        let id = &class.entity.id;
        let mut mapping = ResolvedMapping {
            ontology_id: id.clone(),
            label: class.label.clone(),
            version: class.version.clone(),
            matches: IndexMap::new(),
        };

        let records = by_source.remove(id).unwrap_or_default();
        let has_concept = records
            .iter()
            .any(|r| r.match_level == MatchLevel::Concept);
        let has_ancestor = records
            .iter()
            .any(|r| r.match_level == MatchLevel::Ancestor);

        for record in records {
            let keep = match record.match_level {
                MatchLevel::Concept => true,
                MatchLevel::Child => has_concept,
                MatchLevel::Ancestor => !has_concept,
                MatchLevel::Fuzzy => !has_concept && !has_ancestor,
            };
            if keep {
                mapping.push(record.clone());
            }
        }

        let levels: Vec<MatchLevel> = mapping
            .matches
            .values()
            .flatten()
            .map(|r| r.match_level)
            .collect();
        if levels.contains(&MatchLevel::Concept) {
            stats.concept_matches += 1;
            if levels.contains(&MatchLevel::Child) {
                stats.child_matches += 1;
            }
        } else if levels.contains(&MatchLevel::Ancestor) {
            stats.ancestor_matches += 1;
        } else if levels.contains(&MatchLevel::Fuzzy) {
            stats.fuzzy_matches += 1;
        } else {
            stats.unmatched += 1;
            stats.no_match.push(id.clone());
        }

        resolved.insert(id.clone(), mapping);
    }

    info!(
        concept = stats.concept_matches,
        ancestor = stats.ancestor_matches,
        child = stats.child_matches,
        fuzzy = stats.fuzzy_matches,
        unmatched = stats.unmatched,
        "aggregated mapping results"
    );
    (resolved, stats)
}
