//! TF-IDF vector space with cosine search and percentile filtering.
//!
//! Term features are word n-grams of length 1 to 3 over the processed
//! token lists. Document vectors use smoothed inverse document frequency
//! and are L2-normalized, so cosine similarity is a sparse dot product.

use std::collections::HashMap;

use crate::similarity::preprocess::Document;

const NGRAM_MAX: usize = 3;

/// Sparse L2-normalized document vector, term indices ascending.
pub type SparseVector = Vec<(usize, f64)>;

/// Fitted TF-IDF matrix over one corpus.
#[derive(Debug)]
pub struct TfidfMatrix {
    vocabulary: HashMap<String, usize>,
    pub vectors: Vec<SparseVector>,
}

fn ngrams(tokens: &[String]) -> Vec<String> {
    let mut grams = Vec::new();
    for n in 1..=NGRAM_MAX {
        if tokens.len() < n {
            break;
        }
        for window in tokens.windows(n) {
            grams.push(window.join(" "));
        }
    }
    grams
}

impl TfidfMatrix {
    /// Fit the vocabulary and produce one vector per corpus document.
    pub fn fit(corpus: &[Document]) -> Self {
        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let mut doc_terms: Vec<HashMap<usize, f64>> = Vec::with_capacity(corpus.len());
        let mut doc_freq: HashMap<usize, usize> = HashMap::new();

        for doc in corpus {
            let mut counts: HashMap<usize, f64> = HashMap::new();
            for gram in ngrams(&doc.tokens) {
                let next_index = vocabulary.len();
                let index = *vocabulary.entry(gram).or_insert(next_index);
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
            for &index in counts.keys() {
                *doc_freq.entry(index).or_insert(0) += 1;
            }
            doc_terms.push(counts);
        }

        let n_docs = corpus.len() as f64;
        let mut vectors = Vec::with_capacity(doc_terms.len());
        for counts in doc_terms {
            let mut vector: SparseVector = counts
                .into_iter()
                .map(|(index, tf)| {
                    let df = doc_freq[&index] as f64;
                    // smoothed idf, as if one extra document held every term
                    let idf = ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0;
                    (index, tf * idf)
                })
                .collect();
            vector.sort_unstable_by_key(|(index, _)| *index);
            let norm = vector.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
            if norm > 0.0 {
                for (_, w) in &mut vector {
                    *w /= norm;
                }
            }
            vectors.push(vector);
        }

        Self { vocabulary, vectors }
    }

    pub fn n_terms(&self) -> usize {
        self.vocabulary.len()
    }
}

/// Dot product of two sparse L2-normalized vectors.
pub fn cosine(a: &SparseVector, b: &SparseVector) -> f64 {
    let (mut i, mut j, mut dot) = (0usize, 0usize, 0.0f64);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                dot += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    dot
}

/// Percentile with linear interpolation between closest ranks.
pub fn percentile(scores: &[f64], pct: f64) -> f64 {
    assert!(!scores.is_empty(), "percentile of empty score list");
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("comparable scores"));
    let pct = pct.clamp(0.0, 100.0);
    let rank = (sorted.len() - 1) as f64 * pct / 100.0;
    let low = rank.floor() as usize;
    let high = rank.ceil() as usize;
    if low == high {
        sorted[low]
    } else {
        let weight = rank - low as f64;
        sorted[low] * (1.0 - weight) + sorted[high] * weight
    }
}
