//! In-memory context graph
//!
//! Nodes are the last-known-good snapshot of entries added through the
//! manager; the authoritative copy lives in the vector backend. Edges are
//! directed, typed, and weighted. The graph is a cache with a documented
//! staleness contract, not a source of truth: dangling edges to targets that
//! exist only remotely are allowed but excluded from in-process lookups.

use crate::types::{ContextEntry, RelatedMemory, RelationshipRef};
use std::collections::HashMap;

/// One directed edge between two entries
#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub rel_type: String,
    pub strength: f32,
}

/// In-memory index of entry nodes and relationship edges
#[derive(Debug, Default)]
pub struct ContextGraph {
    nodes: HashMap<String, ContextEntry>,
    edges: Vec<GraphEdge>,
}

impl ContextGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a node
    pub fn upsert_node(&mut self, entry: ContextEntry) {
        self.nodes.insert(entry.id.clone(), entry);
    }

    /// Append one edge per declared relationship of `source`
    ///
    /// Edges are appended, never merged; relationship rewrite paths go
    /// through [`replace_edges_from`](Self::replace_edges_from).
    pub fn add_edges(&mut self, source: &str, relationships: &[RelationshipRef]) {
        for rel in relationships {
            self.edges.push(GraphEdge {
                source: source.to_string(),
                target: rel.target_id.clone(),
                rel_type: rel.rel_type.clone(),
                strength: rel.strength,
            });
        }
    }

    /// Drop every outgoing edge of `source` and install the given set
    pub fn replace_edges_from(&mut self, source: &str, relationships: &[RelationshipRef]) {
        self.edges.retain(|edge| edge.source != source);
        self.add_edges(source, relationships);
    }

    /// Remove a node together with all edges mentioning it as source or target
    ///
    /// Returns whether the node existed.
    pub fn remove_node(&mut self, id: &str) -> bool {
        let existed = self.nodes.remove(id).is_some();
        self.edges
            .retain(|edge| edge.source != id && edge.target != id);
        existed
    }

    /// Look up a node by id
    pub fn node(&self, id: &str) -> Option<&ContextEntry> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Outgoing edges of `id`, as related-memory results
    ///
    /// Empty when the node was never added through the manager.
    pub fn related_of(&self, id: &str) -> Vec<RelatedMemory> {
        if !self.nodes.contains_key(id) {
            return Vec::new();
        }

        self.edges
            .iter()
            .filter(|edge| edge.source == id)
            .map(|edge| RelatedMemory {
                id: edge.target.clone(),
                relationship: edge.rel_type.clone(),
                strength: edge.strength,
            })
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
