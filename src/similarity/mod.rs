//! Similarity stage: TF-IDF cosine matching for still-unresolved entities.

pub mod preprocess;
pub mod tfidf;

use std::collections::HashMap;

use tracing::info;

use crate::{
    config::MatchConfig,
    matching::record::{MatchLevel, MatchRecord, MatchType},
    model::entity::{ClinicalConcept, OntologyClass, StringKind},
};
use preprocess::Document;
use tfidf::TfidfMatrix;

/// Tuning knobs for the fuzzy matcher.
#[derive(Debug, Clone, Copy)]
pub struct FuzzyParams {
    /// Candidates retained per entity before filtering.
    pub top_n: usize,
    /// Percentile cut-off over surviving candidate scores.
    pub percentile: f64,
}

impl Default for FuzzyParams {
    fn default() -> Self {
        Self {
            top_n: 10,
            percentile: 75.0,
        }
    }
}

/// Scores at or below this floor are noise and are dropped before the
/// percentile is computed, so the percentile reflects plausible candidates.
pub const SCORE_FLOOR: f64 = 0.25;

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Find fuzzy candidates for entities unresolved by the earlier stages.
///
/// One TF-IDF space is fit over the union of both corpora: ontology labels,
/// definitions and synonyms on the query side, clinical labels and synonyms
/// on the candidate side. Each surviving candidate becomes a `fuzzy`
/// record with its similarity rounded to three decimals.
pub fn match_fuzzy(
    unmatched: &[&OntologyClass],
    candidates: &[&ClinicalConcept],
    cfg: &MatchConfig,
    params: &FuzzyParams,
) -> Vec<MatchRecord> {
    let mut corpus: Vec<Document> = Vec::new();
    let mut seen_rows: std::collections::HashSet<String> = std::collections::HashSet::new();
    let mut query_rows: HashMap<String, Vec<usize>> = HashMap::new();
    let mut candidate_rows: Vec<usize> = Vec::new();
    let mut candidate_owner: HashMap<usize, String> = HashMap::new();

    for class in unmatched {
        for string in &class.entity.strings {
            if let Some(doc) =
                Document::new(&class.entity.id, string.kind, &string.text, &cfg.stopwords)
            {
                // duplicate strings for one entity collapse on row_id
                if !seen_rows.insert(doc.row_id.clone()) {
                    continue;
                }
                query_rows
                    .entry(class.entity.id.clone())
                    .or_default()
                    .push(corpus.len());
                corpus.push(doc);
            }
        }
    }
    for concept in candidates {
        for string in concept.entity.strings.iter().filter(|s| s.kind != StringKind::Definition) {
            if let Some(doc) =
                Document::new(&concept.entity.id, string.kind, &string.text, &cfg.stopwords)
            {
                if !seen_rows.insert(doc.row_id.clone()) {
                    continue;
                }
                candidate_owner.insert(corpus.len(), concept.entity.id.clone());
                candidate_rows.push(corpus.len());
                corpus.push(doc);
            }
        }
    }

    if query_rows.is_empty() || candidate_rows.is_empty() {
        info!("similarity stage skipped: empty query or candidate corpus");
        return Vec::new();
    }

    let matrix = TfidfMatrix::fit(&corpus);
    info!(
        documents = corpus.len(),
        terms = matrix.n_terms(),
        "fit tf-idf matrix"
    );

    let mut records = Vec::new();
    for class in unmatched {
        let Some(rows) = query_rows.get(&class.entity.id) else {
            continue;
        };

        // best score per clinical target across every query row
        let mut best: HashMap<String, (f64, String)> = HashMap::new();
        for &row in rows {
            let query = &matrix.vectors[row];
            let mut scored: Vec<(f64, usize)> = candidate_rows
                .iter()
                .map(|&idx| (tfidf::cosine(query, &matrix.vectors[idx]), idx))
                .filter(|(score, _)| *score > SCORE_FLOOR)
                .collect();
            scored.sort_by(|a, b| b.0.partial_cmp(&a.0).expect("comparable scores"));
            for (score, idx) in scored.into_iter().take(params.top_n) {
                let target = candidate_owner[&idx].clone();
                let row_id = corpus[idx].row_id.clone();
                let entry = best.entry(target).or_insert((score, row_id.clone()));
                if score > entry.0 {
                    *entry = (score, row_id);
                }
            }
        }
        if best.is_empty() {
            continue;
        }

        let scores: Vec<f64> = best.values().map(|(score, _)| *score).collect();
        let cut = tfidf::percentile(&scores, params.percentile);
        let mut survivors: Vec<(String, f64, String)> = best
            .into_iter()
            .filter(|(_, (score, _))| *score >= cut)
            .map(|(target, (score, row_id))| (target, score, row_id))
            .collect();
        survivors.sort_by(|a, b| a.0.cmp(&b.0));

        for (target, score, row_id) in survivors {
            let score = round3(score);
            records.push(MatchRecord {
                source_id: class.entity.id.clone(),
                target_id: target,
                match_level: MatchLevel::Fuzzy,
                match_types: std::collections::BTreeSet::from([MatchType::Similarity]),
                evidence: std::collections::BTreeSet::from([format!(
                    "similarity:{row_id}:{score:.3}"
                )]),
                score: Some(score),
            });
        }
    }

    info!(records = records.len(), "similarity stage finished");
    records
}
