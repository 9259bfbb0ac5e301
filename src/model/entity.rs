//! Entity model shared by the ontology and clinical sides of a mapping run.
//!
//! Entities are immutable once their table is built. Each table also keeps
//! pre-computed join indexes (normalized code, cross-reference and string
//! keys back to entity ids) so the exact-match stage reduces to set
//! intersections over hash lookups.

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

/// Raised when an input row lacks the fields needed to identify an entity.
#[derive(Debug, Error)]
#[error("entity {id:?} is missing identifying fields: {detail}")]
pub struct MissingFieldError {
    pub id: String,
    pub detail: String,
}

/// Classification of a text attribute on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StringKind {
    Label,
    Synonym,
    Definition,
}

impl StringKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StringKind::Label => "label",
            StringKind::Synonym => "synonym",
            StringKind::Definition => "definition",
        }
    }
}

/// One text attribute with its kind tag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EntityString {
    pub text: String,
    pub kind: StringKind,
}

/// A cross-reference code tagged with its source vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Dbxref {
    /// Source vocabulary tag after alias normalization.
    pub source: String,
    /// Source vocabulary tag as it appeared in the input.
    pub raw_source: String,
    pub code: String,
}

/// Identifier material common to ontology classes and clinical concepts.
#[derive(Debug, Clone, Default)]
pub struct Entity {
    pub id: String,
    pub codes: BTreeSet<String>,
    pub dbxrefs: BTreeSet<Dbxref>,
    pub strings: BTreeSet<EntityString>,
}

impl Entity {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::default()
        }
    }

    /// Label and synonym text only, the fields used for exact string joins.
    pub fn match_strings(&self) -> impl Iterator<Item = &EntityString> {
        self.strings
            .iter()
            .filter(|s| s.kind != StringKind::Definition)
    }

    fn validate(&self) -> Result<(), MissingFieldError> {
        if self.id.trim().is_empty() {
            return Err(MissingFieldError {
                id: self.id.clone(),
                detail: "empty identifier".into(),
            });
        }
        if self.codes.is_empty() && self.strings.is_empty() {
            return Err(MissingFieldError {
                id: self.id.clone(),
                detail: "no codes and no strings".into(),
            });
        }
        Ok(())
    }
}

/// An ontology class with display metadata carried to the output table.
#[derive(Debug, Clone)]
pub struct OntologyClass {
    pub entity: Entity,
    pub label: String,
    pub version: String,
    pub semantic_type: String,
}

/// A clinical vocabulary concept with display metadata.
#[derive(Debug, Clone)]
pub struct ClinicalConcept {
    pub entity: Entity,
    pub label: String,
    /// Vocabulary tag after alias normalization, used for filtering.
    pub vocabulary: String,
    /// Vocabulary tag as supplied, carried to the output.
    pub raw_vocabulary: String,
    pub domain: String,
    pub concept_class: String,
    pub standard_flag: String,
    /// Original (un-normalized) source code for the output table.
    pub source_code: String,
}

/// Normalize a code for equi-joins: trim and uppercase.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Normalize free text for exact string joins: case-fold, strip
/// punctuation, collapse whitespace.
pub fn normalize_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_space = true;
    for ch in raw.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Join indexes from normalized keys back to entity ids.
#[derive(Debug, Default)]
pub struct JoinIndex {
    pub by_code: HashMap<String, BTreeSet<String>>,
    pub by_dbxref: HashMap<String, BTreeSet<String>>,
    pub by_string: HashMap<String, BTreeSet<String>>,
}

impl JoinIndex {
    fn insert_entity(&mut self, entity: &Entity) {
        for code in &entity.codes {
            self.by_code
                .entry(normalize_code(code))
                .or_default()
                .insert(entity.id.clone());
        }
        for xref in &entity.dbxrefs {
            self.by_dbxref
                .entry(normalize_code(&xref.code))
                .or_default()
                .insert(entity.id.clone());
        }
        for string in entity.match_strings() {
            let key = normalize_text(&string.text);
            if !key.is_empty() {
                self.by_string.entry(key).or_default().insert(entity.id.clone());
            }
        }
    }
}

/// All ontology classes for one run, keyed by id in input order.
#[derive(Debug, Default)]
pub struct OntologyTable {
    pub classes: IndexMap<String, OntologyClass>,
    pub index: JoinIndex,
}

impl OntologyTable {
    pub fn insert(&mut self, class: OntologyClass) -> Result<(), MissingFieldError> {
        class.entity.validate()?;
        self.index.insert_entity(&class.entity);
        self.classes.insert(class.entity.id.clone(), class);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&OntologyClass> {
        self.classes.get(id)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// All clinical concepts for one run, keyed by concept id in input order.
#[derive(Debug, Default)]
pub struct ClinicalTable {
    pub concepts: IndexMap<String, ClinicalConcept>,
    pub index: JoinIndex,
}

impl ClinicalTable {
    pub fn insert(&mut self, concept: ClinicalConcept) -> Result<(), MissingFieldError> {
        concept.entity.validate()?;
        self.index.insert_entity(&concept.entity);
        self.concepts.insert(concept.entity.id.clone(), concept);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ClinicalConcept> {
        self.concepts.get(id)
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    /// Subset to concepts participating in one filter vocabulary. A concept
    /// qualifies when its own vocabulary or any cross-reference source
    /// normalizes to the filter tag.
    pub fn filter_by_vocabulary(&self, vocabulary: &str) -> ClinicalTable {
        let want = normalize_code(vocabulary);
        let mut out = ClinicalTable::default();
        for concept in self.concepts.values() {
            let own = normalize_code(&concept.vocabulary) == want;
            let via_xref = concept
                .entity
                .dbxrefs
                .iter()
                .any(|x| normalize_code(&x.source) == want);
            if own || via_xref {
                // validated on first insert
                let _ = out.insert(concept.clone());
            }
        }
        out
    }
}
