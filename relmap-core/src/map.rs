//! Resource graph: one node per resource type, one edge per distinct
//! (source, destination, relation) triple.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    #[error("Unknown endpoint '{0}': nodes must be added before edges")]
    UnknownEndpoint(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceNode {
    pub name: String,
    /// False when the resource was first reached through a link outside the
    /// primary API version.
    pub primary_version: bool,
}

/// Borrowed view of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RelationEdge<'a> {
    pub source: &'a str,
    pub destination: &'a str,
    pub relation: &'a str,
}

#[derive(Debug, Default)]
pub struct ResourceGraph {
    graph: DiGraph<ResourceNode, String>,
    index: HashMap<String, NodeIndex>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a primary-version node. Returns false if it already existed.
    pub fn add_node(&mut self, name: &str) -> bool {
        self.add_tagged_node(name, true)
    }

    /// Adds a node tagged with its version. An existing node keeps the tag it
    /// was created with.
    pub fn add_tagged_node(&mut self, name: &str, primary_version: bool) -> bool {
        if self.index.contains_key(name) {
            return false;
        }
        let idx = self.graph.add_node(ResourceNode {
            name: name.to_string(),
            primary_version,
        });
        self.index.insert(name.to_string(), idx);
        true
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn node(&self, name: &str) -> Option<&ResourceNode> {
        self.index.get(name).map(|&idx| &self.graph[idx])
    }

    /// Adds an edge unless the same triple already exists. Returns whether an
    /// edge was inserted.
    pub fn add_edge(
        &mut self,
        source: &str,
        destination: &str,
        relation: &str,
    ) -> Result<bool, MapError> {
        let from = self.endpoint(source)?;
        let to = self.endpoint(destination)?;
        if self.connects(from, to, relation) {
            return Ok(false);
        }
        self.graph.add_edge(from, to, relation.to_string());
        Ok(true)
    }

    pub fn has_edge(&self, source: &str, destination: &str, relation: &str) -> bool {
        match (self.index.get(source), self.index.get(destination)) {
            (Some(&from), Some(&to)) => self.connects(from, to, relation),
            _ => false,
        }
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &ResourceNode> {
        self.graph.node_indices().map(|idx| &self.graph[idx])
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = RelationEdge<'_>> {
        self.graph.edge_references().map(|edge| RelationEdge {
            source: &self.graph[edge.source()].name,
            destination: &self.graph[edge.target()].name,
            relation: edge.weight(),
        })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Position of a node in [`ResourceGraph::nodes`] order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).map(|idx| idx.index())
    }

    fn endpoint(&self, name: &str) -> Result<NodeIndex, MapError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| MapError::UnknownEndpoint(name.to_string()))
    }

    fn connects(&self, from: NodeIndex, to: NodeIndex, relation: &str) -> bool {
        self.graph
            .edges_connecting(from, to)
            .any(|edge| edge.weight() == relation)
    }
}
