use onto_crosswalk::{
    matching::exact::match_exact,
    matching::record::{MatchRecord, MatchType},
    model::entity::{
        ClinicalConcept, ClinicalTable, Dbxref, Entity, EntityString, OntologyClass,
        OntologyTable, StringKind,
    },
};

fn class(id: &str) -> OntologyClass {
    OntologyClass {
        entity: Entity::new(id),
        label: String::new(),
        version: "HP".into(),
        semantic_type: String::new(),
    }
}

fn concept(id: &str, vocabulary: &str) -> ClinicalConcept {
    ClinicalConcept {
        entity: Entity::new(id),
        label: String::new(),
        vocabulary: vocabulary.to_string(),
        raw_vocabulary: vocabulary.to_string(),
        domain: "Condition".into(),
        concept_class: String::new(),
        standard_flag: "S".into(),
        source_code: String::new(),
    }
}

fn string(text: &str, kind: StringKind) -> EntityString {
    EntityString {
        text: text.to_string(),
        kind,
    }
}

#[test]
fn code_join_matches_on_normalized_codes() {
    let mut ontology = OntologyTable::default();
    let mut side = class("HP_0008181");
    side.entity.codes.insert("190787008".into());
    ontology.insert(side).unwrap();

    let mut clinical = ClinicalTable::default();
    let mut target = concept("4098595", "SNOMED");
    target.entity.codes.insert(" 190787008 ".into());
    clinical.insert(target).unwrap();

    let out = match_exact(&ontology, &clinical);
    assert_eq!(out.code.len(), 1);
    assert_eq!(out.code[0].source_id, "HP_0008181");
    assert_eq!(out.code[0].target_id, "4098595");
    assert!(out.code[0].evidence.contains("code:190787008"));
}

#[test]
fn dbxref_join_runs_both_directions() {
    let mut ontology = OntologyTable::default();
    let mut side = class("HP_0008181");
    side.entity.dbxrefs.insert(Dbxref {
        source: "UMLS".into(),
        raw_source: "UMLS".into(),
        code: "C0000744".into(),
    });
    side.entity.codes.insert("D000012".into());
    ontology.insert(side).unwrap();

    let mut clinical = ClinicalTable::default();
    let mut via_code = concept("100", "UMLS");
    via_code.entity.codes.insert("C0000744".into());
    clinical.insert(via_code).unwrap();
    let mut via_xref = concept("200", "SNOMED");
    via_xref.entity.codes.insert("999".into());
    via_xref.entity.dbxrefs.insert(Dbxref {
        source: "MESH".into(),
        raw_source: "MeSH".into(),
        code: "D000012".into(),
    });
    clinical.insert(via_xref).unwrap();

    let out = match_exact(&ontology, &clinical);
    let targets: Vec<&str> = out.dbxref.iter().map(|r| r.target_id.as_str()).collect();
    assert!(targets.contains(&"100"), "ontology xref against clinical code");
    assert!(targets.contains(&"200"), "ontology code against clinical xref");
    assert!(out
        .dbxref
        .iter()
        .all(|r| r.match_types.contains(&MatchType::Dbxref)));
}

#[test]
fn string_join_is_case_and_punctuation_insensitive() {
    let mut ontology = OntologyTable::default();
    let mut side = class("HP_0000925");
    side.entity
        .strings
        .insert(string("Abnormality of the vertebral column", StringKind::Label));
    ontology.insert(side).unwrap();

    let mut clinical = ClinicalTable::default();
    let mut target = concept("12345", "SNOMED");
    target.entity.codes.insert("55".into());
    target
        .entity
        .strings
        .insert(string("ABNORMALITY OF THE VERTEBRAL-COLUMN", StringKind::Synonym));
    clinical.insert(target).unwrap();

    let out = match_exact(&ontology, &clinical);
    assert_eq!(out.string.len(), 1);
    assert_eq!(out.string[0].target_id, "12345");
}

#[test]
fn definitions_never_join() {
    let mut ontology = OntologyTable::default();
    let mut side = class("HP_1");
    side.entity
        .strings
        .insert(string("a rare condition", StringKind::Definition));
    side.entity.codes.insert("1".into());
    ontology.insert(side).unwrap();

    let mut clinical = ClinicalTable::default();
    let mut target = concept("2", "SNOMED");
    target.entity.codes.insert("9".into());
    target
        .entity
        .strings
        .insert(string("a rare condition", StringKind::Label));
    clinical.insert(target).unwrap();

    let out = match_exact(&ontology, &clinical);
    assert!(out.string.is_empty());
}

#[test]
fn pair_found_by_two_joins_keeps_both_records() {
    let mut ontology = OntologyTable::default();
    let mut side = class("HP_0008181");
    side.entity.codes.insert("190787008".into());
    side.entity
        .strings
        .insert(string("Abetalipoproteinemia", StringKind::Label));
    ontology.insert(side).unwrap();

    let mut clinical = ClinicalTable::default();
    let mut target = concept("4098595", "SNOMED");
    target.entity.codes.insert("190787008".into());
    target
        .entity
        .strings
        .insert(string("abetalipoproteinemia", StringKind::Label));
    clinical.insert(target).unwrap();

    let out = match_exact(&ontology, &clinical);
    assert_eq!(out.len(), 2);
    let for_pair: Vec<&MatchRecord> = out
        .iter()
        .filter(|r| r.source_id == "HP_0008181" && r.target_id == "4098595")
        .collect();
    assert_eq!(for_pair.len(), 2);
}

#[test]
fn absorb_unions_types_and_evidence() {
    let mut a = MatchRecord::exact("HP_1", "2", MatchType::Code, "code:X".into());
    let b = MatchRecord::exact("HP_1", "2", MatchType::String, "string:y [label]".into());
    a.absorb(&b);
    assert_eq!(a.match_types.len(), 2);
    assert_eq!(a.evidence.len(), 2);
    assert_eq!(a.types_joined(), "code | string");
}
