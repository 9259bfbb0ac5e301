//! TSV mapping writer and run-statistics sidecar.
//!
//! One date-stamped directory per run holds a mappings TSV per filter
//! vocabulary, a separate children TSV when child refinements exist, and a
//! JSON stats sidecar. Every input ontology entity appears at least once;
//! unmatched entities get an explicit `none` row instead of vanishing.

use std::{fs::File, path::PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::{
    config::Settings,
    matching::record::{MatchLevel, MatchRecord},
    matching::PairOutcome,
    model::entity::ClinicalTable,
};

#[derive(Debug, Serialize)]
struct MappingRow<'a> {
    ontology_id: &'a str,
    ontology_label: &'a str,
    ontology_version: &'a str,
    concept_id: &'a str,
    concept_code: &'a str,
    concept_label: &'a str,
    vocabulary_id: &'a str,
    domain: &'a str,
    standard_flag: &'a str,
    match_level: &'a str,
    match_type: String,
    match_evidence: String,
}

/// Create the `DDMMMYYYY_MAPPINGS` run directory under the outputs root.
pub fn create_run_directory(settings: &Settings) -> Result<PathBuf> {
    let stamp = Utc::now().format("%d%b%Y").to_string().to_uppercase();
    let dir = settings.join_output(format!("{stamp}_MAPPINGS"));
    std::fs::create_dir_all(&dir).context("creating mappings run directory")?;
    Ok(dir)
}

/// Write one pair outcome: mappings TSV, optional children TSV, stats JSON.
pub fn write_outcome(dir: &PathBuf, outcome: &PairOutcome, clinical: &ClinicalTable) -> Result<()> {
    let tag = if outcome.vocabulary == "*" {
        "all".to_string()
    } else {
        outcome.vocabulary.to_lowercase()
    };

    let main_path = dir.join(format!("crosswalk_{tag}_mappings.tsv"));
    let children_path = dir.join(format!("crosswalk_{tag}_children_mappings.tsv"));
    let mut main = tsv_writer(&main_path)?;
    let mut children: Option<csv::Writer<File>> = None;

    let mut main_rows = 0usize;
    for mapping in outcome.resolved.values() {
        if mapping.is_unmatched() {
            main.serialize(MappingRow {
                ontology_id: &mapping.ontology_id,
                ontology_label: &mapping.label,
                ontology_version: &mapping.version,
                concept_id: "",
                concept_code: "",
                concept_label: "",
                vocabulary_id: "",
                domain: "",
                standard_flag: "",
                match_level: "none",
                match_type: String::new(),
                match_evidence: String::new(),
            })?;
            main_rows += 1;
            continue;
        }
        for records in mapping.matches.values() {
            for record in records {
                let row = build_row(mapping, record, clinical);
                if record.match_level == MatchLevel::Child {
                    let writer = match children.as_mut() {
                        Some(w) => w,
                        None => {
                            children = Some(tsv_writer(&children_path)?);
                            children.as_mut().expect("just created")
                        }
                    };
                    writer.serialize(row)?;
                } else {
                    main.serialize(row)?;
                    main_rows += 1;
                }
            }
        }
    }
    main.flush()?;
    if let Some(mut writer) = children {
        writer.flush()?;
        info!(path = %children_path.display(), "wrote children mappings");
    }
    info!(path = %main_path.display(), rows = main_rows, "wrote mappings");

    let stats_path = dir.join(format!("crosswalk_{tag}_stats.json"));
    let stats_file = File::create(&stats_path).context("creating stats sidecar")?;
    serde_json::to_writer_pretty(stats_file, &outcome.stats)?;
    info!(path = %stats_path.display(), "wrote run statistics");
    Ok(())
}

fn tsv_writer(path: &PathBuf) -> Result<csv::Writer<File>> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .with_context(|| format!("creating output file {}", path.display()))
}

fn build_row<'a>(
    mapping: &'a crate::matching::aggregate::ResolvedMapping,
    record: &'a MatchRecord,
    clinical: &'a ClinicalTable,
) -> MappingRow<'a> {
    let concept = clinical.get(&record.target_id);
    MappingRow {
        ontology_id: &mapping.ontology_id,
        ontology_label: &mapping.label,
        ontology_version: &mapping.version,
        concept_id: &record.target_id,
        concept_code: concept.map(|c| c.source_code.as_str()).unwrap_or(""),
        concept_label: concept.map(|c| c.label.as_str()).unwrap_or(""),
        vocabulary_id: concept.map(|c| c.raw_vocabulary.as_str()).unwrap_or(""),
        domain: concept.map(|c| c.domain.as_str()).unwrap_or(""),
        standard_flag: concept.map(|c| c.standard_flag.as_str()).unwrap_or(""),
        match_level: record.match_level.as_str(),
        match_type: record.types_joined(),
        match_evidence: record.evidence_joined(),
    }
}
