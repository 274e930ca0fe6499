//! The `ExecutableNode` trait — the contract every vertex kind must fulfil.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::NodeError;

/// Outputs of a vertex's completed dependencies, keyed by dependency id.
///
/// A `BTreeMap` so that nodes iterating their inputs see a stable order.
pub type Inputs = BTreeMap<String, Value>;

/// Per-invocation context passed to a node.
///
/// Defined here (in the nodes crate) so both the engine and individual node
/// implementations can import it without a circular dependency.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// ID of the job running this vertex.
    pub job_id: Uuid,
    /// ID of the flow the job was submitted with.
    pub flow_id: String,
    /// ID of the vertex being executed.
    pub vertex_id: String,
    /// Outputs of the vertex's dependencies.
    pub inputs: Inputs,
}

/// The core node trait.
///
/// `execute` is the only required method. `on_cancel` is called by the engine
/// for vertices that already succeeded when their job is cancelled, so a node
/// holding external resources can release them.
#[async_trait]
pub trait ExecutableNode: Send + Sync {
    /// Run the vertex with its configuration blob and return its output.
    async fn execute(&self, config: &Value, ctx: &ExecutionContext) -> Result<Value, NodeError>;

    /// Undo or release whatever a successful `execute` left behind.
    async fn on_cancel(&self, _config: &Value, _ctx: &ExecutionContext) -> Result<(), NodeError> {
        Ok(())
    }
}
