//! Staged match-resolution pipeline.
//!
//! Each (ontology, filter-vocabulary) pair runs the same synchronous
//! sequence: exact joins, hierarchy fallback, similarity fallback,
//! aggregation. Pairs share no mutable state, so independent pairs run
//! concurrently over `Arc`-shared read-only tables.

pub mod aggregate;
pub mod exact;
pub mod fallback;
pub mod record;

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use thiserror::Error;
use tracing::{info, instrument};

use crate::{
    config::MatchConfig,
    hierarchy::{CatalogError, HierarchyCatalog},
    model::entity::{ClinicalTable, OntologyTable},
    similarity::{self, FuzzyParams},
};
use aggregate::{ResolvedMapping, RunStats};

/// Fatal pipeline errors; "no match" conditions are data, not errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no ontology entities supplied")]
    EmptyOntology,
    #[error("no clinical entities supplied for vocabulary {0:?}")]
    EmptyClinical(String),
    #[error(transparent)]
    Hierarchy(#[from] CatalogError),
}

/// Shared read-only inputs for every pipeline pair.
#[derive(Debug)]
pub struct PipelineInputs {
    pub ontology: OntologyTable,
    pub clinical: ClinicalTable,
    pub catalog: HierarchyCatalog,
    pub config: MatchConfig,
    pub params: FuzzyParams,
}

/// Output of one (ontology, filter-vocabulary) run.
#[derive(Debug)]
pub struct PairOutcome {
    pub vocabulary: String,
    pub resolved: IndexMap<String, ResolvedMapping>,
    pub stats: RunStats,
}

/// Run the full staged pipeline for one filter vocabulary.
#[instrument(skip(inputs), fields(vocabulary = %vocabulary))]
pub fn run_pair(inputs: &PipelineInputs, vocabulary: &str) -> Result<PairOutcome, PipelineError> {
    if inputs.ontology.is_empty() {
        return Err(PipelineError::EmptyOntology);
    }
    let filtered;
    let clinical: &ClinicalTable = if vocabulary == "*" {
        &inputs.clinical
    } else {
        filtered = inputs.clinical.filter_by_vocabulary(vocabulary);
        &filtered
    };
    if clinical.is_empty() {
        return Err(PipelineError::EmptyClinical(vocabulary.to_string()));
    }

    // stage 1: exact joins
    let exact_matches = exact::match_exact(&inputs.ontology, clinical);
    let matched_set: HashSet<&str> = exact_matches
        .iter()
        .map(|r| r.source_id.as_str())
        .collect();
    let (matched, unmatched): (Vec<String>, Vec<String>) = inputs
        .ontology
        .classes
        .keys()
        .cloned()
        .partition(|id| matched_set.contains(id.as_str()));
    info!(
        matched = matched.len(),
        unmatched = unmatched.len(),
        "exact stage split"
    );

    // stage 2: ancestor fallback and child refinement
    let exact_by_source = fallback::group_by_source(exact_matches.iter().collect());
    let hierarchy_matches = fallback::match_hierarchy(
        &unmatched,
        &matched,
        &inputs.catalog,
        &exact_by_source,
    );

    // stage 3: similarity over entities the hierarchy could not resolve
    let still_unmatched: Vec<_> = hierarchy_matches
        .no_hierarchy
        .iter()
        .filter_map(|id| inputs.ontology.get(id))
        .collect();
    let candidates: Vec<_> = clinical.concepts.values().collect();
    let fuzzy_matches = similarity::match_fuzzy(
        &still_unmatched,
        &candidates,
        &inputs.config,
        &inputs.params,
    );

    // stage 4: precedence, merging, statistics
    let (resolved, stats) = aggregate::aggregate(
        &inputs.ontology,
        &exact_matches,
        &hierarchy_matches,
        &fuzzy_matches,
    );

    Ok(PairOutcome {
        vocabulary: vocabulary.to_string(),
        resolved,
        stats,
    })
}

/// Run one pipeline per filter vocabulary, pairs in parallel.
pub async fn run_pairs(
    inputs: Arc<PipelineInputs>,
    vocabularies: Vec<String>,
) -> Result<Vec<PairOutcome>, PipelineError> {
    let vocabularies = if vocabularies.is_empty() {
        vec!["*".to_string()]
    } else {
        vocabularies
    };
    let concurrency = 2usize;
    let outcomes = stream::iter(vocabularies)
        .map(|vocabulary| {
            let inputs = inputs.clone();
            async move {
                tokio::task::spawn_blocking(move || run_pair(&inputs, &vocabulary))
                    .await
                    .expect("pipeline worker panicked")
            }
        })
        .buffer_unordered(concurrency)
        .collect::<Vec<_>>()
        .await;

    let mut results = Vec::new();
    for outcome in outcomes {
        results.push(outcome?);
    }
    // deterministic output order regardless of completion order
    results.sort_by(|a, b| a.vocabulary.cmp(&b.vocabulary));
    Ok(results)
}
