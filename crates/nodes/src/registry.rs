//! Maps vertex type tags to `ExecutableNode` implementations.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::builtin::{DelayNode, EchoNode, FailNode};
use crate::ExecutableNode;

/// Type-tag → implementation table, built once at startup and shared.
#[derive(Clone, Default)]
pub struct NodeRegistry {
    nodes: HashMap<String, Arc<dyn ExecutableNode>>,
}

impl NodeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the [`builtin`](crate::builtin) kinds.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(EchoNode::TYPE, Arc::new(EchoNode));
        registry.register(DelayNode::TYPE, Arc::new(DelayNode));
        registry.register(FailNode::TYPE, Arc::new(FailNode));
        registry
    }

    /// Register `node` under `type_tag`, replacing any previous entry.
    pub fn register(&mut self, type_tag: impl Into<String>, node: Arc<dyn ExecutableNode>) {
        self.nodes.insert(type_tag.into(), node);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, type_tag: impl Into<String>, node: Arc<dyn ExecutableNode>) -> Self {
        self.register(type_tag, node);
        self
    }

    pub fn get(&self, type_tag: &str) -> Option<Arc<dyn ExecutableNode>> {
        self.nodes.get(type_tag).cloned()
    }

    pub fn contains(&self, type_tag: &str) -> bool {
        self.nodes.contains_key(type_tag)
    }

    /// Registered type tags, sorted.
    pub fn type_tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.nodes.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}

impl fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("types", &self.type_tags())
            .finish()
    }
}
