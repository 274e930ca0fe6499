//! Built-in vertex kinds.
//!
//! These are deliberately small: they exist so a flow can be run end to end
//! (from the CLI, or in tests) without any plugin code.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::{ExecutableNode, ExecutionContext, NodeError};

/// `echo` — outputs `{ "vertex": <id>, "config": <config>, "inputs": {...} }`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoNode;

impl EchoNode {
    pub const TYPE: &'static str = "echo";
}

#[async_trait]
impl ExecutableNode for EchoNode {
    async fn execute(&self, config: &Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let inputs: Map<String, Value> = ctx
            .inputs
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(json!({
            "vertex": ctx.vertex_id,
            "config": config,
            "inputs": inputs,
        }))
    }
}

/// `delay` — sleeps for `config.ms` milliseconds, then forwards its inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelayNode;

impl DelayNode {
    pub const TYPE: &'static str = "delay";
}

#[async_trait]
impl ExecutableNode for DelayNode {
    async fn execute(&self, config: &Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let ms = config
            .get("ms")
            .and_then(Value::as_u64)
            .ok_or_else(|| NodeError::InvalidConfig("delay requires an integer `ms`".into()))?;

        debug!(vertex_id = %ctx.vertex_id, ms, "delaying");
        tokio::time::sleep(Duration::from_millis(ms)).await;

        Ok(Value::Object(
            ctx.inputs
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ))
    }
}

/// `fail` — always fails with `config.message` (or a generic message).
#[derive(Debug, Clone, Copy, Default)]
pub struct FailNode;

impl FailNode {
    pub const TYPE: &'static str = "fail";
}

#[async_trait]
impl ExecutableNode for FailNode {
    async fn execute(&self, config: &Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let message = config
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| format!("vertex '{}' failed", ctx.vertex_id));
        Err(NodeError::Failed(message))
    }
}
