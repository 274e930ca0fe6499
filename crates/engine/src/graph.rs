//! Graph model — validated adjacency built from a flow's vertex and edge lists.
//!
//! Rules enforced by [`Graph::from_flow`]:
//! 1. Vertex IDs must be non-empty and unique within the flow.
//! 2. Every edge (and every `depends_on` entry) must reference a known vertex.
//! 3. The directed graph must be acyclic.
//!
//! Vertices are addressed by their position in `Flow::vertices`; that index is
//! also the scheduler's tie-break key.

use std::collections::{HashMap, HashSet};

use crate::error::ValidationError;
use crate::models::Flow;
use crate::scheduler::topological_order;

/// Forward and reverse adjacency over a flow's vertices.
#[derive(Debug, Clone)]
pub struct Graph {
    ids: Vec<String>,
    index: HashMap<String, usize>,
    /// vertex → vertices that depend on it.
    dependents: Vec<Vec<usize>>,
    /// vertex → vertices it depends on.
    dependencies: Vec<Vec<usize>>,
}

impl Graph {
    /// Build and fully validate the graph for `flow`.
    ///
    /// # Errors
    /// - [`ValidationError::EmptyVertexId`] / [`ValidationError::DuplicateVertexId`]
    /// - [`ValidationError::UnknownVertexReference`] for a dangling edge.
    /// - [`ValidationError::Cycle`] if the graph is not acyclic.
    pub fn from_flow(flow: &Flow) -> Result<Self, ValidationError> {
        let graph = Self::unchecked(flow)?;
        topological_order(&graph)?;
        Ok(graph)
    }

    /// Structural checks only; the result may contain cycles.
    pub(crate) fn unchecked(flow: &Flow) -> Result<Self, ValidationError> {
        let mut index: HashMap<String, usize> = HashMap::with_capacity(flow.vertices.len());
        for (i, vertex) in flow.vertices.iter().enumerate() {
            if vertex.id.is_empty() {
                return Err(ValidationError::EmptyVertexId);
            }
            if index.insert(vertex.id.clone(), i).is_some() {
                return Err(ValidationError::DuplicateVertexId(vertex.id.clone()));
            }
        }

        let lookup = |id: &str, side: &'static str| {
            index
                .get(id)
                .copied()
                .ok_or_else(|| ValidationError::UnknownVertexReference {
                    vertex_id: id.to_owned(),
                    side,
                })
        };

        let declared = flow.edges.iter().map(|e| (e.from.as_str(), e.to.as_str()));
        let implied = flow.vertices.iter().flat_map(|v| {
            v.depends_on
                .iter()
                .map(move |dep| (dep.as_str(), v.id.as_str()))
        });

        let n = flow.vertices.len();
        let mut dependents = vec![Vec::new(); n];
        let mut dependencies = vec![Vec::new(); n];
        let mut seen: HashSet<(usize, usize)> = HashSet::new();

        for (from, to) in declared.chain(implied) {
            let from = lookup(from, "from")?;
            let to = lookup(to, "to")?;
            if seen.insert((from, to)) {
                dependents[from].push(to);
                dependencies[to].push(from);
            }
        }

        Ok(Self {
            ids: flow.vertices.iter().map(|v| v.id.clone()).collect(),
            index,
            dependents,
            dependencies,
        })
    }

    /// Vertex IDs in flow order.
    pub fn vertex_ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.dependents.iter().map(Vec::len).sum()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn id(&self, index: usize) -> &str {
        &self.ids[index]
    }

    /// Forward adjacency by index.
    pub fn dependents(&self, index: usize) -> &[usize] {
        &self.dependents[index]
    }

    /// Reverse adjacency by index.
    pub fn dependencies(&self, index: usize) -> &[usize] {
        &self.dependencies[index]
    }

    /// Forward adjacency by ID; empty for an unknown ID.
    pub fn dependents_of(&self, id: &str) -> Vec<&str> {
        self.index_of(id)
            .map(|i| self.dependents[i].iter().map(|&d| self.id(d)).collect())
            .unwrap_or_default()
    }

    /// Reverse adjacency by ID; empty for an unknown ID.
    pub fn dependencies_of(&self, id: &str) -> Vec<&str> {
        self.index_of(id)
            .map(|i| self.dependencies[i].iter().map(|&d| self.id(d)).collect())
            .unwrap_or_default()
    }
}
