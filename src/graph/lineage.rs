//! Explicit lineage adjacency
//!
//! Ancestry is resolved over an edge list keyed by child id instead of by
//! following live entity references, so a corrupt store containing a cycle
//! cannot send reloading into unbounded recursion.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use super::{
    extract_singleton_parent, optional_parent, ArtefactId, RelationshipId, RelationshipRecord,
};
use crate::{Error, Result};

/// Edge list keyed by child artefact id.
#[derive(Debug, Default, Clone)]
pub struct LineageGraph {
    by_child: FxHashMap<ArtefactId, Vec<RelationshipRecord>>,
    known_edges: FxHashSet<RelationshipId>,
    loaded: FxHashSet<ArtefactId>,
}

impl LineageGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from already fetched edges.
    #[must_use]
    pub fn from_edges(edges: impl IntoIterator<Item = RelationshipRecord>) -> Self {
        let mut graph = Self::new();
        for edge in edges {
            graph.add_edge(edge);
        }
        graph
    }

    /// Add an edge, ignoring duplicates by relationship id.
    ///
    /// Returns whether the edge was new.
    pub fn add_edge(&mut self, edge: RelationshipRecord) -> bool {
        if !self.known_edges.insert(edge.id) {
            return false;
        }
        self.by_child.entry(edge.child).or_default().push(edge);
        true
    }

    /// Number of distinct edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.known_edges.len()
    }

    /// Edges pointing into `child`.
    #[must_use]
    pub fn parent_edges(&self, child: ArtefactId) -> &[RelationshipRecord] {
        self.by_child.get(&child).map_or(&[], Vec::as_slice)
    }

    /// Singleton parent of `child` through `relationship_type`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Loading`] when the edge is missing or ambiguous.
    pub fn singleton_parent(
        &self,
        child: ArtefactId,
        relationship_type: &str,
    ) -> Result<ArtefactId> {
        extract_singleton_parent(self.parent_edges(child), child, relationship_type)
    }

    /// Follow `relationship_type` edges upwards from `start`.
    ///
    /// The returned chain starts with `start` and ends at the first node with
    /// no such parent edge. Edges of nodes not seen yet are pulled lazily
    /// through `fetch`, one call per node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Loading`] when a node has several parents of that type,
    /// when the chain revisits a node, or when it grows beyond `max_depth`
    /// ancestors. Errors from `fetch` are propagated.
    pub fn walk_ancestors<F>(
        &mut self,
        start: ArtefactId,
        relationship_type: &str,
        max_depth: usize,
        mut fetch: F,
    ) -> Result<Vec<ArtefactId>>
    where
        F: FnMut(ArtefactId) -> Result<Vec<RelationshipRecord>>,
    {
        let mut chain = vec![start];
        let mut visited = FxHashSet::default();
        visited.insert(start);
        let mut current = start;
        loop {
            if self.loaded.insert(current) {
                for edge in fetch(current)? {
                    self.add_edge(edge);
                }
            }
            let Some(parent) = optional_parent(self.parent_edges(current), current, relationship_type)?
            else {
                break;
            };
            if !visited.insert(parent) {
                return Err(Error::Loading(format!(
                    "lineage cycle through <{relationship_type}> detected at artefact {parent}"
                )));
            }
            if chain.len() > max_depth {
                return Err(Error::Loading(format!(
                    "lineage of artefact {start} exceeds the maximum depth of {max_depth}"
                )));
            }
            chain.push(parent);
            current = parent;
        }
        debug!(start = %start, relationship_type, depth = chain.len() - 1, "walked lineage");
        Ok(chain)
    }
}
