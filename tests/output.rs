use std::sync::Arc;

use onto_crosswalk::{
    config::{MatchConfig, Settings},
    hierarchy::{AdjacencyTable, HierarchyCatalog},
    matching::{run_pair, PipelineInputs},
    model::entity::{
        ClinicalConcept, ClinicalTable, Entity, EntityString, OntologyClass, OntologyTable,
        StringKind,
    },
    output,
    similarity::FuzzyParams,
};

fn class(id: &str, label: &str, code: Option<&str>) -> OntologyClass {
    let mut entity = Entity::new(id);
    if let Some(code) = code {
        entity.codes.insert(code.to_string());
    }
    entity.strings.insert(EntityString {
        text: label.to_string(),
        kind: StringKind::Label,
    });
    OntologyClass {
        entity,
        label: label.to_string(),
        version: "HP".into(),
        semantic_type: String::new(),
    }
}

fn concept(id: &str, label: &str, code: &str) -> ClinicalConcept {
    let mut entity = Entity::new(id);
    entity.codes.insert(code.to_string());
    entity.strings.insert(EntityString {
        text: label.to_string(),
        kind: StringKind::Label,
    });
    ClinicalConcept {
        entity,
        label: label.to_string(),
        vocabulary: "SNOMED".into(),
        raw_vocabulary: "SNOMED".into(),
        domain: "Condition".into(),
        concept_class: String::new(),
        standard_flag: "S".into(),
        source_code: code.to_string(),
    }
}

/// HP_A and HP_B match exactly, HP_B is a child of HP_A, HP_C matches nothing.
fn fixture() -> PipelineInputs {
    let mut ontology = OntologyTable::default();
    ontology.insert(class("HP_A", "Alpha", Some("1"))).unwrap();
    ontology.insert(class("HP_B", "Beta", Some("2"))).unwrap();
    ontology
        .insert(class("HP_C", "Gamma delta omega", None))
        .unwrap();

    let mut clinical = ClinicalTable::default();
    clinical.insert(concept("10", "Alpha finding", "1")).unwrap();
    clinical.insert(concept("20", "Beta finding", "2")).unwrap();

    let mut relation = AdjacencyTable::default();
    relation.add_edge("HP_B", "HP_A");
    let catalog = HierarchyCatalog::build(["HP_A", "HP_B", "HP_C"], &relation, None).unwrap();

    PipelineInputs {
        ontology,
        clinical,
        catalog,
        config: MatchConfig::with_defaults(),
        params: FuzzyParams::default(),
    }
}

#[test]
fn run_directory_is_date_stamped() {
    let tmp = tempfile::tempdir().unwrap();
    let settings = Settings {
        data_dir: tmp.path().join("data"),
        outputs_dir: tmp.path().to_path_buf(),
        stopwords_file: None,
        vocabulary_alias_file: None,
        fuzzy_top_n: 10,
        fuzzy_percentile: 75.0,
    };
    let dir = output::create_run_directory(&settings).unwrap();
    assert!(dir.is_dir());
    let name = dir.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.ends_with("_MAPPINGS"), "unexpected run dir {name}");
}

#[test]
fn outcome_writes_mappings_children_and_stats() {
    let inputs = Arc::new(fixture());
    let outcome = run_pair(&inputs, "*").unwrap();

    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().to_path_buf();
    output::write_outcome(&dir, &outcome, &inputs.clinical).unwrap();

    let main = std::fs::read_to_string(dir.join("crosswalk_all_mappings.tsv")).unwrap();
    let mut lines = main.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("ontology_id\tontology_label"));
    let body: Vec<&str> = lines.collect();
    // one concept row per matched entity plus an explicit row for HP_C
    assert!(body.iter().any(|l| l.starts_with("HP_A\t") && l.contains("\tconcept\t")));
    assert!(body.iter().any(|l| l.starts_with("HP_B\t") && l.contains("\tconcept\t")));
    assert!(body.iter().any(|l| l.starts_with("HP_C\t") && l.contains("\tnone\t")));

    // HP_B is an exactly matched child of HP_A, so the refinement file exists
    let children =
        std::fs::read_to_string(dir.join("crosswalk_all_children_mappings.tsv")).unwrap();
    assert!(children
        .lines()
        .any(|l| l.starts_with("HP_A\t") && l.contains("\tchild\t")));

    let stats: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("crosswalk_all_stats.json")).unwrap())
            .unwrap();
    assert_eq!(stats["concept_matches"], 2);
    assert_eq!(stats["unmatched"], 1);
}

#[test]
fn vocabulary_tag_names_the_output_files() {
    let inputs = Arc::new(fixture());
    let outcome = run_pair(&inputs, "SNOMED").unwrap();

    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().to_path_buf();
    output::write_outcome(&dir, &outcome, &inputs.clinical).unwrap();
    assert!(dir.join("crosswalk_snomed_mappings.tsv").is_file());
    assert!(dir.join("crosswalk_snomed_stats.json").is_file());
}
