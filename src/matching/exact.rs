//! Exact-match stage: three independent equi-joins.
//!
//! Codes join against codes, cross-references join against codes from
//! either side, and case-folded punctuation-stripped labels/synonyms join
//! against each other. The three result sets are not mutually exclusive; a
//! pair found by several joins keeps every piece of evidence.

use tracing::info;

use crate::{
    matching::record::{MatchRecord, MatchType},
    model::entity::{normalize_code, normalize_text, ClinicalTable, OntologyTable},
};

/// Output of the exact-match stage, one vector per join.
#[derive(Debug, Default)]
pub struct ExactMatches {
    pub code: Vec<MatchRecord>,
    pub dbxref: Vec<MatchRecord>,
    pub string: Vec<MatchRecord>,
}

impl ExactMatches {
    pub fn iter(&self) -> impl Iterator<Item = &MatchRecord> {
        self.code.iter().chain(&self.dbxref).chain(&self.string)
    }

    pub fn len(&self) -> usize {
        self.code.len() + self.dbxref.len() + self.string.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Run all three equi-joins between the ontology and clinical tables.
pub fn match_exact(ontology: &OntologyTable, clinical: &ClinicalTable) -> ExactMatches {
    let mut out = ExactMatches::default();

    for class in ontology.classes.values() {
        let source = &class.entity.id;

        // 1. ontology codes against clinical codes
        for code in &class.entity.codes {
            if let Some(targets) = clinical.index.by_code.get(&normalize_code(code)) {
                for target in targets {
                    out.code.push(MatchRecord::exact(
                        source,
                        target,
                        MatchType::Code,
                        format!("code:{code}"),
                    ));
                }
            }
        }

        // 2a. ontology cross-references against clinical codes
        for xref in &class.entity.dbxrefs {
            if let Some(targets) = clinical.index.by_code.get(&normalize_code(&xref.code)) {
                for target in targets {
                    out.dbxref.push(MatchRecord::exact(
                        source,
                        target,
                        MatchType::Dbxref,
                        format!("dbxref:{}:{}", xref.raw_source, xref.code),
                    ));
                }
            }
        }

        // 2b. clinical cross-references against ontology codes
        for code in &class.entity.codes {
            if let Some(targets) = clinical.index.by_dbxref.get(&normalize_code(code)) {
                for target in targets {
                    out.dbxref.push(MatchRecord::exact(
                        source,
                        target,
                        MatchType::Dbxref,
                        format!("dbxref:{code} (clinical cross-reference)"),
                    ));
                }
            }
        }

        // 3. labels and synonyms against labels and synonyms
        for string in class.entity.match_strings() {
            let key = normalize_text(&string.text);
            if key.is_empty() {
                continue;
            }
            if let Some(targets) = clinical.index.by_string.get(&key) {
                for target in targets {
                    out.string.push(MatchRecord::exact(
                        source,
                        target,
                        MatchType::String,
                        format!("string:{key} [{}]", string.kind.as_str()),
                    ));
                }
            }
        }
    }

    info!(
        code = out.code.len(),
        dbxref = out.dbxref.len(),
        string = out.string.len(),
        "exact-match stage finished"
    );
    out
}
