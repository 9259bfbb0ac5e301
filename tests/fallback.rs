use std::collections::{BTreeMap, BTreeSet};

use onto_crosswalk::{
    hierarchy::{HierarchyCatalog, LevelIndex},
    matching::fallback::{group_by_source, match_hierarchy},
    matching::record::{MatchLevel, MatchRecord, MatchType},
};

fn level_index(levels: &[&[&str]]) -> LevelIndex {
    let mut index: LevelIndex = BTreeMap::new();
    for (level, ids) in levels.iter().enumerate() {
        index.insert(
            level,
            ids.iter().map(|id| id.to_string()).collect::<BTreeSet<_>>(),
        );
    }
    index
}

fn exact(source: &str, target: &str) -> MatchRecord {
    MatchRecord::exact(source, target, MatchType::Code, format!("code:{target}"))
}

#[test]
fn nearest_matched_ancestor_wins() {
    let mut catalog = HierarchyCatalog::default();
    catalog.ancestors.insert(
        "HP_0000925".into(),
        level_index(&[&["HP_0000924"], &["HP_0000001"]]),
    );
    let records = vec![exact("HP_0000924", "12345"), exact("HP_0000001", "99999")];
    let grouped = group_by_source(records.iter().collect());

    let out = match_hierarchy(&["HP_0000925".into()], &[], &catalog, &grouped);
    assert_eq!(out.ancestor.len(), 1);
    let inherited = &out.ancestor[0];
    assert_eq!(inherited.source_id, "HP_0000925");
    assert_eq!(inherited.target_id, "12345");
    assert_eq!(inherited.match_level, MatchLevel::Ancestor);
    assert!(inherited.evidence.contains("ancestor:HP_0000924 level:0"));
    assert!(out.no_hierarchy.is_empty());
}

#[test]
fn unmatched_near_levels_are_skipped() {
    // level 0 ancestor has no exact match; the walk continues to level 1
    let mut catalog = HierarchyCatalog::default();
    catalog.ancestors.insert(
        "HP_1".into(),
        level_index(&[&["HP_2"], &["HP_3"]]),
    );
    let records = vec![exact("HP_3", "777")];
    let grouped = group_by_source(records.iter().collect());

    let out = match_hierarchy(&["HP_1".into()], &[], &catalog, &grouped);
    assert_eq!(out.ancestor.len(), 1);
    assert!(out.ancestor[0].evidence.contains("ancestor:HP_3 level:1"));
}

#[test]
fn ties_at_the_winning_level_are_all_kept() {
    let mut catalog = HierarchyCatalog::default();
    catalog.ancestors.insert(
        "HP_1".into(),
        level_index(&[&["HP_2", "HP_3"], &["HP_4"]]),
    );
    let records = vec![
        exact("HP_2", "100"),
        exact("HP_3", "200"),
        exact("HP_4", "300"),
    ];
    let grouped = group_by_source(records.iter().collect());

    let out = match_hierarchy(&["HP_1".into()], &[], &catalog, &grouped);
    let targets: BTreeSet<&str> = out.ancestor.iter().map(|r| r.target_id.as_str()).collect();
    assert_eq!(targets, BTreeSet::from(["100", "200"]));
}

#[test]
fn entities_without_matched_ancestors_fall_through() {
    let mut catalog = HierarchyCatalog::default();
    catalog
        .ancestors
        .insert("HP_1".into(), level_index(&[&["HP_2"]]));
    let grouped = group_by_source(Vec::new());

    let out = match_hierarchy(
        &["HP_1".into(), "HP_9".into()],
        &[],
        &catalog,
        &grouped,
    );
    assert!(out.ancestor.is_empty());
    // HP_1 searched and found nothing, HP_9 had no index at all
    assert_eq!(out.no_hierarchy, vec!["HP_1".to_string(), "HP_9".to_string()]);
}

#[test]
fn matched_entities_gain_child_refinements() {
    let mut catalog = HierarchyCatalog::default();
    catalog
        .children
        .insert("HP_0000924".into(), level_index(&[&["HP_0000925"]]));
    let records = vec![
        exact("HP_0000924", "12345"),
        exact("HP_0000925", "67890"),
    ];
    let grouped = group_by_source(records.iter().collect());

    let out = match_hierarchy(&[], &["HP_0000924".into()], &catalog, &grouped);
    assert_eq!(out.child.len(), 1);
    let refined = &out.child[0];
    assert_eq!(refined.source_id, "HP_0000924");
    assert_eq!(refined.target_id, "67890");
    assert_eq!(refined.match_level, MatchLevel::Child);
    assert!(refined.evidence.contains("child:HP_0000925 level:0"));
}

#[test]
fn inherited_records_carry_the_relatives_evidence() {
    let mut catalog = HierarchyCatalog::default();
    catalog
        .ancestors
        .insert("HP_1".into(), level_index(&[&["HP_2"]]));
    let mut record = exact("HP_2", "100");
    record.evidence.insert("string:broad finding [label]".into());
    let records = vec![record];
    let grouped = group_by_source(records.iter().collect());

    let out = match_hierarchy(&["HP_1".into()], &[], &catalog, &grouped);
    assert!(out.ancestor[0].evidence.contains("code:100"));
    assert!(out.ancestor[0]
        .evidence
        .contains("string:broad finding [label]"));
}
