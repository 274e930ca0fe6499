//! `MockNode` — a test double for `ExecutableNode`.
//!
//! Useful in unit and integration tests where a real node implementation is
//! either unavailable or irrelevant.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use crate::{ExecutableNode, ExecutionContext, Inputs, NodeError};

/// Behaviour injected into `MockNode` at construction time.
pub enum MockBehaviour {
    /// Return a specific JSON value.
    ReturnValue(Value),
    /// Fail with a `Failed` error.
    Fail(String),
    /// Panic inside `execute`.
    Panic(String),
    /// Wait until the gate is opened, then return the value.
    Gated(Arc<Notify>, Value),
}

/// A mock node that records every call it receives and returns a
/// programmer-specified result.
pub struct MockNode {
    /// Label used in test assertions.
    pub name: String,
    /// What the node will do when `execute` is called.
    pub behaviour: MockBehaviour,
    /// Dependency inputs seen by this node (in call order).
    pub calls: Arc<Mutex<Vec<Inputs>>>,
    /// Number of `on_cancel` invocations.
    pub cancels: Arc<Mutex<usize>>,
    /// When set, `on_cancel` fails with this message.
    pub cancel_failure: Option<String>,
}

impl MockNode {
    fn with_behaviour(name: impl Into<String>, behaviour: MockBehaviour) -> Self {
        Self {
            name: name.into(),
            behaviour,
            calls: Arc::new(Mutex::new(Vec::new())),
            cancels: Arc::new(Mutex::new(0)),
            cancel_failure: None,
        }
    }

    /// Create a mock that always succeeds with the given value.
    pub fn returning(name: impl Into<String>, value: Value) -> Self {
        Self::with_behaviour(name, MockBehaviour::ReturnValue(value))
    }

    /// Create a mock that always fails.
    pub fn failing(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::with_behaviour(name, MockBehaviour::Fail(msg.into()))
    }

    /// Create a mock that panics when executed.
    pub fn panicking(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::with_behaviour(name, MockBehaviour::Panic(msg.into()))
    }

    /// Create a mock that blocks until the returned gate is notified.
    pub fn gated(name: impl Into<String>, value: Value) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let node = Self::with_behaviour(name, MockBehaviour::Gated(gate.clone(), value));
        (node, gate)
    }

    /// Make `on_cancel` fail with `msg`.
    pub fn failing_on_cancel(mut self, msg: impl Into<String>) -> Self {
        self.cancel_failure = Some(msg.into());
        self
    }

    /// Number of times this node has been executed.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Number of times `on_cancel` has been invoked.
    pub fn cancel_count(&self) -> usize {
        *self.cancels.lock().unwrap()
    }

    /// Inputs received by the `n`th call.
    pub fn inputs_of_call(&self, n: usize) -> Option<Inputs> {
        self.calls.lock().unwrap().get(n).cloned()
    }

    fn output(&self, value: &Value) -> Value {
        // Tag the output with the node's name so tests can trace data
        // flowing through the graph.
        let mut out = json!({ "node": self.name });
        if let (Some(out_obj), Some(v_obj)) = (out.as_object_mut(), value.as_object()) {
            for (k, val) in v_obj {
                out_obj.insert(k.clone(), val.clone());
            }
        }
        out
    }
}

#[async_trait]
impl ExecutableNode for MockNode {
    async fn execute(&self, _config: &Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        self.calls.lock().unwrap().push(ctx.inputs.clone());

        match &self.behaviour {
            MockBehaviour::ReturnValue(v) => Ok(self.output(v)),
            MockBehaviour::Fail(msg) => Err(NodeError::Failed(msg.clone())),
            MockBehaviour::Panic(msg) => panic!("{}", msg),
            MockBehaviour::Gated(gate, v) => {
                gate.notified().await;
                Ok(self.output(v))
            }
        }
    }

    async fn on_cancel(&self, _config: &Value, _ctx: &ExecutionContext) -> Result<(), NodeError> {
        *self.cancels.lock().unwrap() += 1;
        match &self.cancel_failure {
            Some(msg) => Err(NodeError::Failed(msg.clone())),
            None => Ok(()),
        }
    }
}
