//! Level-indexed hierarchy traversal.
//!
//! The indexer walks a directed relation (parents or children) breadth
//! first from a starting entity and records, for every reachable node, the
//! deepest level at which it was discovered. Level 0 holds the direct
//! relations of the start entity. A node rediscovered through a longer
//! alternate path is promoted to the deeper level and re-expanded; the
//! recorded level is therefore the maximum distance ever observed.
//!
//! Postcondition: the union of recorded levels must be the contiguous
//! range `[0, max_level]`. A gap means the traversal bookkeeping or the
//! input graph is broken, and the build fails rather than returning a
//! partial index.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use indexmap::IndexMap;
use thiserror::Error;
use tracing::warn;

/// Fatal traversal error: recorded levels are not contiguous.
#[derive(Debug, Error)]
#[error("hierarchy levels for {entity} are not contiguous: observed {observed:?}")]
pub struct HierarchyConsistencyError {
    pub entity: String,
    pub observed: Vec<usize>,
}

/// Traversal direction over the relation graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ancestors,
    Children,
}

/// Direct-relation provider for hierarchy traversal.
pub trait Relation {
    fn neighbours(&self, id: &str, direction: Direction) -> Vec<String>;
}

/// Adjacency-table relation built from `child -> parent` edges.
#[derive(Debug, Default, Clone)]
pub struct AdjacencyTable {
    parents: HashMap<String, BTreeSet<String>>,
    children: HashMap<String, BTreeSet<String>>,
}

impl AdjacencyTable {
    pub fn add_edge(&mut self, child: &str, parent: &str) {
        self.parents
            .entry(child.to_string())
            .or_default()
            .insert(parent.to_string());
        self.children
            .entry(parent.to_string())
            .or_default()
            .insert(child.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}

impl Relation for AdjacencyTable {
    fn neighbours(&self, id: &str, direction: Direction) -> Vec<String> {
        let map = match direction {
            Direction::Ancestors => &self.parents,
            Direction::Children => &self.children,
        };
        map.get(id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}

/// Level-indexed relatives of one start entity: level -> ids at that level.
pub type LevelIndex = BTreeMap<usize, BTreeSet<String>>;

/// Build the level index for one entity, or `None` when it has no direct
/// relations in the requested direction.
pub fn build_index<R: Relation + ?Sized>(
    start: &str,
    relation: &R,
    direction: Direction,
    filter_namespace: Option<&str>,
) -> Result<Option<LevelIndex>, HierarchyConsistencyError> {
    let keep = |id: &String| filter_namespace.map_or(true, |ns| id.contains(ns));

    let seeds: Vec<String> = relation
        .neighbours(start, direction)
        .into_iter()
        .filter(|id| id != start && keep(id))
        .collect();
    if seeds.is_empty() {
        return Ok(None);
    }

    let mut levels: HashMap<String, usize> = HashMap::new();
    let mut frontier: VecDeque<(String, usize)> = VecDeque::new();
    for seed in seeds {
        levels.insert(seed.clone(), 0);
        frontier.push_back((seed, 0));
    }

    while let Some((node, level)) = frontier.pop_front() {
        // superseded by a deeper rediscovery of the same node
        if levels.get(&node) != Some(&level) {
            continue;
        }
        for next in relation.neighbours(&node, direction) {
            if next == start || !keep(&next) {
                continue;
            }
            let proposed = level + 1;
            if let Some(&current) = levels.get(&next) {
                if proposed <= current {
                    continue;
                }
            }
            // a simple path cannot be longer than the discovered node set;
            // anything deeper implies a cycle
            if proposed > levels.len() {
                warn!(entity = %start, node = %next, level = proposed, "cycle detected; not re-expanding");
                continue;
            }
            levels.insert(next.clone(), proposed);
            frontier.push_back((next, proposed));
        }
    }

    let mut index: LevelIndex = BTreeMap::new();
    for (node, level) in levels {
        index.entry(level).or_default().insert(node);
    }
    validate_contiguity(start, &index)?;
    Ok(Some(index))
}

/// Check the contiguity postcondition on a finished index.
pub fn validate_contiguity(
    entity: &str,
    index: &LevelIndex,
) -> Result<(), HierarchyConsistencyError> {
    let observed: Vec<usize> = index.keys().copied().collect();
    if let (Some(&first), Some(&last)) = (observed.first(), observed.last()) {
        if first != 0 || observed.len() != last + 1 {
            return Err(HierarchyConsistencyError {
                entity: entity.to_string(),
                observed,
            });
        }
    }
    Ok(())
}

/// Per-entity ancestor and children indexes for a full entity set.
#[derive(Debug, Default)]
pub struct HierarchyCatalog {
    pub ancestors: IndexMap<String, LevelIndex>,
    pub children: IndexMap<String, LevelIndex>,
}

/// Raised when the relation yields nothing for every queried entity; a
/// relation that knows none of the inputs cannot be told apart from a
/// broken one.
#[derive(Debug, Error)]
#[error("hierarchy relation returned no neighbours for any of {queried} entities")]
pub struct EmptyRelationError {
    pub queried: usize,
}

/// Catalog build error.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Consistency(#[from] HierarchyConsistencyError),
    #[error(transparent)]
    EmptyRelation(#[from] EmptyRelationError),
}

impl HierarchyCatalog {
    /// Build ancestor and children indexes for every id in `ids`.
    pub fn build<'a, R, I>(
        ids: I,
        relation: &R,
        filter_namespace: Option<&str>,
    ) -> Result<Self, CatalogError>
    where
        R: Relation + ?Sized,
        I: IntoIterator<Item = &'a str>,
    {
        let mut catalog = HierarchyCatalog::default();
        let mut queried = 0usize;
        for id in ids {
            queried += 1;
            if let Some(index) = build_index(id, relation, Direction::Ancestors, filter_namespace)? {
                catalog.ancestors.insert(id.to_string(), index);
            }
            if let Some(index) = build_index(id, relation, Direction::Children, filter_namespace)? {
                catalog.children.insert(id.to_string(), index);
            }
        }
        if queried > 0 && catalog.ancestors.is_empty() && catalog.children.is_empty() {
            return Err(EmptyRelationError { queried }.into());
        }
        Ok(catalog)
    }
}
