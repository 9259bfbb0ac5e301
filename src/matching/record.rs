//! Match bookkeeping types shared by all pipeline stages.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

/// Where in the resolution pipeline a match was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchLevel {
    /// Direct exact match between the two entities.
    Concept,
    /// Inherited from an exactly matched ancestor.
    Ancestor,
    /// Additive refinement from an exactly matched child.
    Child,
    /// Text-similarity candidate.
    Fuzzy,
}

impl MatchLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchLevel::Concept => "concept",
            MatchLevel::Ancestor => "ancestor",
            MatchLevel::Child => "child",
            MatchLevel::Fuzzy => "fuzzy",
        }
    }
}

impl fmt::Display for MatchLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which evidence source produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Code,
    Dbxref,
    String,
    Similarity,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Code => "code",
            MatchType::Dbxref => "dbxref",
            MatchType::String => "string",
            MatchType::Similarity => "similarity",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One piece of evidence linking an ontology entity to a clinical concept.
///
/// Stages only append records; aggregation merges them per
/// `(source, target, level)` by unioning types and evidence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRecord {
    pub source_id: String,
    pub target_id: String,
    pub match_level: MatchLevel,
    pub match_types: BTreeSet<MatchType>,
    pub evidence: BTreeSet<String>,
    /// Cosine similarity for fuzzy records, `None` otherwise.
    pub score: Option<f64>,
}

impl MatchRecord {
    pub fn exact(source: &str, target: &str, match_type: MatchType, evidence: String) -> Self {
        Self {
            source_id: source.to_string(),
            target_id: target.to_string(),
            match_level: MatchLevel::Concept,
            match_types: BTreeSet::from([match_type]),
            evidence: BTreeSet::from([evidence]),
            score: None,
        }
    }

    /// Merge another record for the same pair and level into this one.
    pub fn absorb(&mut self, other: &MatchRecord) {
        debug_assert_eq!(self.source_id, other.source_id);
        debug_assert_eq!(self.target_id, other.target_id);
        debug_assert_eq!(self.match_level, other.match_level);
        self.match_types.extend(other.match_types.iter().copied());
        self.evidence.extend(other.evidence.iter().cloned());
        self.score = match (self.score, other.score) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    /// Pipe-joined match types for the output table.
    pub fn types_joined(&self) -> String {
        self.match_types
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// Pipe-joined evidence strings for the output table.
    pub fn evidence_joined(&self) -> String {
        self.evidence.iter().cloned().collect::<Vec<_>>().join(" | ")
    }
}
