use std::collections::BTreeMap;

use onto_crosswalk::hierarchy::{
    build_index, validate_contiguity, AdjacencyTable, Direction, HierarchyCatalog,
};
use proptest::prelude::*;

fn chain(ids: &[&str]) -> AdjacencyTable {
    let mut table = AdjacencyTable::default();
    for pair in ids.windows(2) {
        table.add_edge(pair[0], pair[1]);
    }
    table
}

#[test]
fn chain_levels_are_contiguous_from_zero() {
    let table = chain(&["HP_3", "HP_2", "HP_1", "HP_0"]);
    let index = build_index("HP_3", &table, Direction::Ancestors, None)
        .unwrap()
        .unwrap();
    assert_eq!(index.len(), 3);
    assert!(index[&0].contains("HP_2"));
    assert!(index[&1].contains("HP_1"));
    assert!(index[&2].contains("HP_0"));
}

#[test]
fn leaf_entity_returns_none() {
    let table = chain(&["HP_1", "HP_0"]);
    let index = build_index("HP_0", &table, Direction::Ancestors, None).unwrap();
    assert!(index.is_none());
}

#[test]
fn children_direction_walks_downward() {
    let table = chain(&["HP_2", "HP_1", "HP_0"]);
    let index = build_index("HP_0", &table, Direction::Children, None)
        .unwrap()
        .unwrap();
    assert!(index[&0].contains("HP_1"));
    assert!(index[&1].contains("HP_2"));
}

#[test]
fn rediscovery_keeps_deepest_level() {
    // diamond with one long side: start -> a -> b -> top, start -> top
    let mut table = AdjacencyTable::default();
    table.add_edge("start", "a");
    table.add_edge("start", "top");
    table.add_edge("a", "b");
    table.add_edge("b", "top");
    let index = build_index("start", &table, Direction::Ancestors, None)
        .unwrap()
        .unwrap();
    // top is reachable at level 0 and level 2; the deeper path wins
    assert!(index[&2].contains("top"));
    assert!(!index[&0].contains("top"));
    assert!(index[&0].contains("a"));
    assert!(index[&1].contains("b"));
}

#[test]
fn namespace_filter_restricts_traversal() {
    let mut table = AdjacencyTable::default();
    table.add_edge("HP_1", "HP_0");
    table.add_edge("HP_1", "MONDO_9");
    let index = build_index("HP_1", &table, Direction::Ancestors, Some("HP"))
        .unwrap()
        .unwrap();
    assert_eq!(index.len(), 1);
    assert!(index[&0].contains("HP_0"));
    assert!(!index[&0].contains("MONDO_9"));
}

#[test]
fn cycle_terminates_and_reports_inconsistency() {
    let mut table = AdjacencyTable::default();
    table.add_edge("start", "a");
    table.add_edge("a", "b");
    table.add_edge("b", "a");
    // the a/b cycle promotes both nodes past level 0, leaving a gap
    let result = build_index("start", &table, Direction::Ancestors, None);
    assert!(result.is_err());
}

#[test]
fn level_gap_is_a_consistency_error() {
    let mut index = BTreeMap::new();
    index.insert(0usize, std::collections::BTreeSet::from(["a".to_string()]));
    index.insert(2usize, std::collections::BTreeSet::from(["b".to_string()]));
    let err = validate_contiguity("HP_1", &index).unwrap_err();
    assert!(err.to_string().contains("not contiguous"));
}

#[test]
fn empty_relation_fails_catalog_build() {
    let table = AdjacencyTable::default();
    let result = HierarchyCatalog::build(["HP_1", "HP_2"], &table, None);
    assert!(result.is_err());
}

#[test]
fn catalog_indexes_both_directions() {
    let table = chain(&["HP_2", "HP_1", "HP_0"]);
    let catalog =
        HierarchyCatalog::build(["HP_2", "HP_1", "HP_0"], &table, None).unwrap();
    assert!(catalog.ancestors.contains_key("HP_2"));
    assert!(catalog.children.contains_key("HP_0"));
    assert!(!catalog.ancestors.contains_key("HP_0"));
}

proptest! {
    #[test]
    fn layered_graphs_always_yield_contiguous_levels(widths in prop::collection::vec(1usize..4, 1..6)) {
        // fully connected consecutive layers: every node of layer i has
        // every node of layer i+1 as a parent
        let mut table = AdjacencyTable::default();
        let name = |layer: usize, slot: usize| format!("L{layer}_{slot}");
        for slot in 0..widths[0] {
            table.add_edge("start", &name(0, slot));
        }
        for layer in 1..widths.len() {
            for child in 0..widths[layer - 1] {
                for parent in 0..widths[layer] {
                    table.add_edge(&name(layer - 1, child), &name(layer, parent));
                }
            }
        }
        let index = build_index("start", &table, Direction::Ancestors, None)
            .unwrap()
            .unwrap();
        let levels: Vec<usize> = index.keys().copied().collect();
        prop_assert_eq!(levels, (0..widths.len()).collect::<Vec<_>>());
        for (layer, width) in widths.iter().enumerate() {
            prop_assert_eq!(index[&layer].len(), *width);
        }
    }
}
