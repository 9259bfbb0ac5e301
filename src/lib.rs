//! Concept matching and resolution engine for ontology/clinical crosswalks.
//!
//! Aligns biomedical ontology classes (OBO foundry) with clinical
//! terminology concepts by combining exact identifier, cross-reference and
//! string matches with ontology-hierarchy fallback search and TF-IDF
//! cosine similarity.

pub mod cli;
pub mod config;
pub mod hierarchy;
pub mod logging;
pub mod matching;
pub mod model;
pub mod output;
pub mod similarity;
