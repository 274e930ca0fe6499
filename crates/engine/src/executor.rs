//! Job executor.
//!
//! `JobExecutor` drives one [`Job`] from `pending` to a terminal status:
//! 1. Marks the job `running` and emits `vertices_sorted` (seq 0).
//! 2. Runs vertices one at a time in plan order, handing each node its
//!    configuration plus the outputs of its dependencies.
//! 3. Checks for a cancellation request before every vertex; a vertex that
//!    has started always runs to completion.
//! 4. Stops at the first failing vertex (no engine-level retries).
//! 5. Records the terminal status, then emits exactly one `end` event and
//!    closes the stream.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use nodes::{ExecutableNode, ExecutionContext, Inputs, NodeRegistry};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{CancellationError, VertexExecutionError};
use crate::events::{EndPayload, EventKind, JobEvent};
use crate::job::{Job, JobStatus};
use crate::scheduler::ExecutionPlan;

/// How the vertex loop ended.
enum Outcome {
    Completed,
    Failed(VertexExecutionError),
    Cancelled,
}

/// Sole writer of a job's status, results table, and event stream.
pub struct JobExecutor {
    job: Arc<Job>,
    plan: Arc<ExecutionPlan>,
    nodes: Arc<NodeRegistry>,
    /// vertex id → output, for vertices that succeeded.
    results: HashMap<String, Value>,
    /// Indices of succeeded vertices, in completion order.
    succeeded: Vec<usize>,
    next_seq: u64,
}

impl JobExecutor {
    pub fn new(job: Arc<Job>, nodes: Arc<NodeRegistry>) -> Self {
        let plan = Arc::clone(job.plan());
        Self {
            job,
            plan,
            nodes,
            results: HashMap::new(),
            succeeded: Vec::new(),
            next_seq: 0,
        }
    }

    /// Run the job to completion and return its terminal status.
    ///
    /// Never fails: vertex and cancellation failures are reported through the
    /// event stream.
    #[instrument(skip(self), fields(job_id = %self.job.id(), flow_id = %self.job.flow_id()))]
    pub async fn run(mut self) -> JobStatus {
        self.job.mark_running();
        info!("job started: {} vertices", self.plan.order().len());

        self.emit(EventKind::VerticesSorted(self.plan.order_ids())).await;

        let (status, end) = match self.run_vertices().await {
            Outcome::Completed => {
                info!("job completed");
                (JobStatus::Completed, EndPayload::completed())
            }
            Outcome::Failed(err) => {
                warn!("job errored: {}", err);
                (JobStatus::Errored, EndPayload::errored(err.to_string()))
            }
            Outcome::Cancelled => {
                let unwind = self.release_succeeded().await;
                match &unwind {
                    Ok(()) => info!("job cancelled"),
                    Err(err) => error!("job cancelled with errors: {}", err),
                }
                (
                    JobStatus::Cancelled,
                    EndPayload::cancelled(unwind.err().map(|e| e.to_string())),
                )
            }
        };

        self.job.set_terminal(status);
        self.emit(EventKind::End(end)).await;
        self.job.close_events();
        status
    }

    // -----------------------------------------------------------------------
    // Vertex loop
    // -----------------------------------------------------------------------

    async fn run_vertices(&mut self) -> Outcome {
        let plan = Arc::clone(&self.plan);

        for &index in plan.order() {
            if self.job.is_cancel_requested() {
                warn!("cancellation requested, stopping before '{}'", plan.graph().id(index));
                return Outcome::Cancelled;
            }

            let vertex_id = plan.graph().id(index).to_owned();
            self.emit(EventKind::Start {
                vertex_id: vertex_id.clone(),
            })
            .await;

            match self.execute_vertex(index).await {
                Ok(output) => {
                    debug!(vertex_id = %vertex_id, "vertex succeeded");
                    self.results.insert(vertex_id.clone(), output.clone());
                    self.succeeded.push(index);
                    self.emit(EventKind::Success { vertex_id, output }).await;
                }
                Err(err) => {
                    warn!(vertex_id = %vertex_id, "vertex failed: {}", err.message);
                    self.emit(EventKind::Error {
                        vertex_id,
                        error: err.message.clone(),
                    })
                    .await;
                    return Outcome::Failed(err);
                }
            }
        }

        Outcome::Completed
    }

    async fn execute_vertex(&self, index: usize) -> Result<Value, VertexExecutionError> {
        let vertex = self.plan.vertex(index);
        let node = self.node_for(index)?;
        let ctx = self.context(index);

        debug!(vertex_id = %vertex.id, vertex_type = %vertex.vertex_type, "executing vertex");

        match AssertUnwindSafe(node.execute(&vertex.config, &ctx))
            .catch_unwind()
            .await
        {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(err)) => Err(VertexExecutionError {
                vertex_id: vertex.id.clone(),
                message: err.to_string(),
            }),
            Err(panic) => Err(VertexExecutionError {
                vertex_id: vertex.id.clone(),
                message: format!("node panicked: {}", panic_message(panic.as_ref())),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Cancellation
    // -----------------------------------------------------------------------

    /// Call `on_cancel` on every succeeded vertex, most recent first. Every
    /// hook runs even if an earlier one fails.
    async fn release_succeeded(&self) -> Result<(), CancellationError> {
        let mut failures = Vec::new();

        for &index in self.succeeded.iter().rev() {
            let vertex = self.plan.vertex(index);
            let node = match self.node_for(index) {
                Ok(node) => node,
                Err(err) => {
                    failures.push(err);
                    continue;
                }
            };
            let ctx = self.context(index);

            let message = match AssertUnwindSafe(node.on_cancel(&vertex.config, &ctx))
                .catch_unwind()
                .await
            {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => err.to_string(),
                Err(panic) => format!("node panicked: {}", panic_message(panic.as_ref())),
            };

            error!(vertex_id = %vertex.id, "cancellation hook failed: {}", message);
            failures.push(VertexExecutionError {
                vertex_id: vertex.id.clone(),
                message,
            });
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CancellationError { failures })
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn node_for(&self, index: usize) -> Result<Arc<dyn ExecutableNode>, VertexExecutionError> {
        let vertex = self.plan.vertex(index);
        self.nodes
            .get(&vertex.vertex_type)
            .ok_or_else(|| VertexExecutionError {
                vertex_id: vertex.id.clone(),
                message: format!(
                    "no implementation registered for vertex type '{}'",
                    vertex.vertex_type
                ),
            })
    }

    fn context(&self, index: usize) -> ExecutionContext {
        let graph = self.plan.graph();
        let inputs: Inputs = graph
            .dependencies(index)
            .iter()
            .filter_map(|&dep| {
                let id = graph.id(dep);
                self.results.get(id).map(|out| (id.to_owned(), out.clone()))
            })
            .collect();

        ExecutionContext {
            job_id: self.job.id().as_uuid(),
            flow_id: self.job.flow_id().to_owned(),
            vertex_id: graph.id(index).to_owned(),
            inputs,
        }
    }

    async fn emit(&mut self, kind: EventKind) {
        let event = JobEvent::new(self.job.id(), self.next_seq, kind);
        self.next_seq += 1;
        if self.job.bus().emit(event).await.is_err() {
            // Only `Job::finish` closes the bus, and it runs after the last emit.
            error!("event bus closed before the job finished");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
