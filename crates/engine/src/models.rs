//! Core domain models for the job engine.
//!
//! These types are what a caller hands to [`Engine::submit`](crate::Engine::submit).
//! They deserialise from the JSON flow documents the CLI reads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Vertex
// ---------------------------------------------------------------------------

/// A single unit of work in the flow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// Unique identifier within this flow (referenced by edges).
    pub id: String,
    /// Maps to a registered `ExecutableNode` implementation.
    #[serde(rename = "type")]
    pub vertex_type: String,
    /// Arbitrary configuration passed to the node at execution time.
    #[serde(default)]
    pub config: Value,
    /// Vertices this one depends on, in addition to any `edges` targeting it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl Vertex {
    pub fn new(id: impl Into<String>, vertex_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            vertex_type: vertex_type.into(),
            config: Value::Null,
            depends_on: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    pub fn depends_on(mut self, source: impl Into<String>) -> Self {
        self.depends_on.push(source.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Edge
// ---------------------------------------------------------------------------

/// Directed edge: `to` depends on `from`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Flow
// ---------------------------------------------------------------------------

/// A complete flow definition.
///
/// The order of `vertices` is significant: it breaks ties in the execution
/// order when several vertices are ready at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub id: String,
    pub vertices: Vec<Vertex>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Flow {
    pub fn new(id: impl Into<String>, vertices: Vec<Vertex>, edges: Vec<Edge>) -> Self {
        Self {
            id: id.into(),
            vertices,
            edges,
        }
    }

    /// Look a vertex up by id.
    pub fn vertex(&self, id: &str) -> Option<&Vertex> {
        self.vertices.iter().find(|v| v.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flow_document_deserialises() {
        let flow: Flow = serde_json::from_value(json!({
            "id": "build",
            "vertices": [
                { "id": "fetch", "type": "echo", "config": { "url": "x" } },
                { "id": "parse", "type": "echo", "depends_on": ["fetch"] },
                { "id": "store", "type": "delay" }
            ],
            "edges": [ { "from": "parse", "to": "store" } ]
        }))
        .unwrap();

        assert_eq!(flow.vertices.len(), 3);
        assert_eq!(flow.vertices[0].config["url"], "x");
        assert_eq!(flow.vertices[1].depends_on, vec!["fetch"]);
        assert_eq!(flow.vertices[2].config, Value::Null);
        assert_eq!(flow.edges, vec![Edge::new("parse", "store")]);
        assert_eq!(flow.vertex("parse").map(|v| v.vertex_type.as_str()), Some("echo"));
    }

    #[test]
    fn edges_default_to_empty() {
        let flow: Flow = serde_json::from_value(json!({
            "id": "solo",
            "vertices": [ { "id": "a", "type": "echo" } ]
        }))
        .unwrap();
        assert!(flow.edges.is_empty());
    }
}
