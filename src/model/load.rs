//! Readers for the three normalized input tables.
//!
//! All inputs are delimited text with a header row; `.tsv` extensions are
//! read tab-separated, everything else comma-separated. Rows aggregate by
//! identifier: one entity accumulates every code, cross-reference and
//! string found across its rows, matching how the upstream ontology and
//! vocabulary extracts are shaped.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::{
    config::MatchConfig,
    hierarchy::AdjacencyTable,
    model::{
        aliases,
        entity::{ClinicalConcept, ClinicalTable, Dbxref, Entity, EntityString, OntologyClass, OntologyTable, StringKind},
    },
};

#[derive(Debug, Deserialize)]
struct OntologyRow {
    id: String,
    #[serde(default)]
    code: String,
    #[serde(default)]
    dbxref: String,
    #[serde(default)]
    dbxref_type: String,
    #[serde(default)]
    string: String,
    #[serde(default)]
    string_type: String,
    #[serde(default)]
    semantic_type: String,
    #[serde(default)]
    source_abbrev: String,
}

#[derive(Debug, Deserialize)]
struct ClinicalRow {
    concept_id: String,
    #[serde(default)]
    code: String,
    #[serde(default)]
    vocabulary: String,
    #[serde(default)]
    domain: String,
    #[serde(default)]
    class: String,
    #[serde(default)]
    standard_flag: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    synonym: String,
}

#[derive(Debug, Deserialize)]
struct AdjacencyRow {
    child_id: String,
    parent_id: String,
}

fn reader_for(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    let delimiter = match path.extension().and_then(|e| e.to_str()) {
        Some("tsv") => b'\t',
        _ => b',',
    };
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening input table {}", path.display()))
}

fn is_blank(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none")
}

fn string_kind(tag: &str) -> StringKind {
    let tag = tag.to_lowercase();
    if tag.contains("definition") {
        StringKind::Definition
    } else if tag.contains("synonym") {
        StringKind::Synonym
    } else {
        StringKind::Label
    }
}

/// Split a `SOURCE:code` cross-reference into its tagged parts.
fn parse_dbxref(raw: &str, type_hint: &str, cfg: &MatchConfig) -> Dbxref {
    let (source, code) = match raw.split_once(':') {
        Some((s, c)) if !s.trim().is_empty() => (s.trim().to_string(), c.trim().to_string()),
        _ => (type_hint.trim().to_string(), raw.trim().to_string()),
    };
    Dbxref {
        source: aliases::normalize_vocabulary(&cfg.vocabulary_aliases, &source),
        raw_source: source,
        code,
    }
}

/// Read ontology rows and aggregate them into one class per identifier.
pub fn read_ontology_table(path: &Path, cfg: &MatchConfig) -> Result<OntologyTable> {
    let mut reader = reader_for(path)?;
    let mut table = OntologyTable::default();
    let mut staged: indexmap::IndexMap<String, OntologyClass> = indexmap::IndexMap::new();

    for row in reader.deserialize() {
        let row: OntologyRow = row.context("parsing ontology row")?;
        if is_blank(&row.id) {
            continue;
        }
        let class = staged.entry(row.id.clone()).or_insert_with(|| OntologyClass {
            entity: Entity::new(&row.id),
            label: String::new(),
            version: String::new(),
            semantic_type: String::new(),
        });
        if !is_blank(&row.code) {
            class.entity.codes.insert(row.code.trim().to_string());
        }
        if !is_blank(&row.dbxref) {
            class
                .entity
                .dbxrefs
                .insert(parse_dbxref(&row.dbxref, &row.dbxref_type, cfg));
        }
        if !is_blank(&row.string) {
            let kind = string_kind(&row.string_type);
            if kind == StringKind::Label && class.label.is_empty() {
                class.label = row.string.trim().to_string();
            }
            class.entity.strings.insert(EntityString {
                text: row.string.trim().to_string(),
                kind,
            });
        }
        if class.semantic_type.is_empty() && !is_blank(&row.semantic_type) {
            class.semantic_type = row.semantic_type.trim().to_string();
        }
        if class.version.is_empty() && !is_blank(&row.source_abbrev) {
            class.version = row.source_abbrev.trim().to_string();
        }
    }

    for (_, class) in staged {
        table.insert(class)?;
    }
    info!(path = %path.display(), classes = table.len(), "loaded ontology table");
    Ok(table)
}

/// Read clinical rows and aggregate them into one concept per identifier.
pub fn read_clinical_table(path: &Path, cfg: &MatchConfig) -> Result<ClinicalTable> {
    let mut reader = reader_for(path)?;
    let mut table = ClinicalTable::default();
    let mut staged: indexmap::IndexMap<String, ClinicalConcept> = indexmap::IndexMap::new();

    for row in reader.deserialize() {
        let row: ClinicalRow = row.context("parsing clinical row")?;
        if is_blank(&row.concept_id) {
            continue;
        }
        let concept = staged
            .entry(row.concept_id.clone())
            .or_insert_with(|| ClinicalConcept {
                entity: Entity::new(&row.concept_id),
                label: String::new(),
                vocabulary: String::new(),
                raw_vocabulary: String::new(),
                domain: String::new(),
                concept_class: String::new(),
                standard_flag: String::new(),
                source_code: String::new(),
            });
        if !is_blank(&row.code) {
            let code = row.code.trim().to_string();
            if concept.source_code.is_empty() {
                concept.source_code = code.clone();
            }
            if is_blank(&row.vocabulary) || concept.raw_vocabulary.is_empty()
                || row.vocabulary.trim() == concept.raw_vocabulary
            {
                concept.entity.codes.insert(code);
            } else {
                // codes tagged with a different source act as cross-references
                concept.entity.dbxrefs.insert(Dbxref {
                    source: aliases::normalize_vocabulary(&cfg.vocabulary_aliases, &row.vocabulary),
                    raw_source: row.vocabulary.trim().to_string(),
                    code,
                });
            }
        }
        if concept.raw_vocabulary.is_empty() && !is_blank(&row.vocabulary) {
            concept.raw_vocabulary = row.vocabulary.trim().to_string();
            concept.vocabulary =
                aliases::normalize_vocabulary(&cfg.vocabulary_aliases, &row.vocabulary);
        }
        if concept.domain.is_empty() && !is_blank(&row.domain) {
            concept.domain = row.domain.trim().to_string();
        }
        if concept.concept_class.is_empty() && !is_blank(&row.class) {
            concept.concept_class = row.class.trim().to_string();
        }
        if concept.standard_flag.is_empty() && !is_blank(&row.standard_flag) {
            concept.standard_flag = row.standard_flag.trim().to_string();
        }
        if !is_blank(&row.label) {
            if concept.label.is_empty() {
                concept.label = row.label.trim().to_string();
            }
            concept.entity.strings.insert(EntityString {
                text: row.label.trim().to_string(),
                kind: StringKind::Label,
            });
        }
        if !is_blank(&row.synonym) {
            concept.entity.strings.insert(EntityString {
                text: row.synonym.trim().to_string(),
                kind: StringKind::Synonym,
            });
        }
    }

    for (_, concept) in staged {
        table.insert(concept)?;
    }
    info!(path = %path.display(), concepts = table.len(), "loaded clinical table");
    Ok(table)
}

/// Read a `child_id,parent_id` adjacency table into a relation.
pub fn read_adjacency_table(path: &Path) -> Result<AdjacencyTable> {
    let mut reader = reader_for(path)?;
    let mut table = AdjacencyTable::default();
    let mut rows = 0usize;
    for row in reader.deserialize() {
        let row: AdjacencyRow = row.context("parsing hierarchy adjacency row")?;
        if is_blank(&row.child_id) || is_blank(&row.parent_id) {
            continue;
        }
        table.add_edge(row.child_id.trim(), row.parent_id.trim());
        rows += 1;
    }
    info!(path = %path.display(), edges = rows, "loaded hierarchy adjacency");
    Ok(table)
}
