//! `Engine`: the facade callers use to run and observe jobs.
//!
//! Four operations: [`submit`](Engine::submit), [`subscribe`](Engine::subscribe),
//! [`cancel`](Engine::cancel) and [`status`](Engine::status). Structural
//! problems (bad flow, unknown job) come back as [`EngineError`]; everything
//! that goes wrong while a job runs is only visible on its event stream.

use std::sync::Arc;

use futures::Stream;
use nodes::NodeRegistry;
use queue::Subscription;
use tokio::task::JoinHandle;
use tracing::{info, Instrument};

use crate::config::EngineConfig;
use crate::error::{EngineError, ValidationError};
use crate::events::JobEvent;
use crate::executor::JobExecutor;
use crate::job::{Job, JobId, JobInfo, JobStatus};
use crate::models::Flow;
use crate::registry::JobRegistry;
use crate::scheduler::ExecutionPlan;

/// A reader over one job's events, starting wherever it was opened.
pub type EventSubscription = Subscription<JobEvent>;

/// Cheap to clone; clones share the same registry.
#[derive(Debug, Clone)]
pub struct Engine {
    registry: Arc<JobRegistry>,
    nodes: Arc<NodeRegistry>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(nodes: NodeRegistry, config: EngineConfig) -> Self {
        Self {
            registry: Arc::new(JobRegistry::new(&config)),
            nodes: Arc::new(nodes),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Validate `flow` without running it: graph checks plus a registered
    /// implementation for every vertex type.
    ///
    /// # Errors
    /// The first [`ValidationError`] found.
    pub fn validate(&self, flow: Flow) -> Result<ExecutionPlan, ValidationError> {
        let plan = ExecutionPlan::new(flow)?;

        if let Some(vertex) = plan
            .flow()
            .vertices
            .iter()
            .find(|v| !self.nodes.contains(&v.vertex_type))
        {
            return Err(ValidationError::UnknownVertexType {
                vertex_id: vertex.id.clone(),
                vertex_type: vertex.vertex_type.clone(),
            });
        }

        Ok(plan)
    }

    /// Validate `flow`, create a job for it, and start executing it on its own
    /// task. Returns as soon as the job is registered.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// [`EngineError::Validation`] if the flow is malformed; no job is created.
    pub fn submit(&self, flow: Flow) -> Result<JobId, EngineError> {
        let plan = Arc::new(self.validate(flow)?);
        let job = self.registry.create(plan);
        let id = job.id();

        info!(job_id = %id, flow_id = %job.flow_id(), "job submitted");

        let executor = JobExecutor::new(job, Arc::clone(&self.nodes));
        tokio::spawn(executor.run().in_current_span());

        Ok(id)
    }

    /// Replay the job's events from `vertices_sorted` onward. The subscription
    /// ends after `end`.
    ///
    /// # Errors
    /// [`EngineError::NotFound`] for an unknown or evicted job.
    pub fn subscribe(&self, id: JobId) -> Result<EventSubscription, EngineError> {
        Ok(self.registry.get(id)?.subscribe())
    }

    /// Resume the job's events at `offset` (the `seq` of the next event wanted).
    /// An offset the job has not reached yet waits for that event; past the
    /// `end` event the subscription is empty.
    ///
    /// # Errors
    /// [`EngineError::NotFound`] for an unknown or evicted job.
    pub fn subscribe_from(&self, id: JobId, offset: usize) -> Result<EventSubscription, EngineError> {
        Ok(self.registry.get(id)?.subscribe_from(offset))
    }

    /// [`subscribe`](Self::subscribe) as a [`Stream`].
    ///
    /// # Errors
    /// [`EngineError::NotFound`] for an unknown or evicted job.
    pub fn events(&self, id: JobId) -> Result<impl Stream<Item = JobEvent> + Send + 'static, EngineError> {
        Ok(self.subscribe(id)?.into_stream())
    }

    /// Request cancellation. Idempotent; the effect shows up on the event
    /// stream once the current vertex finishes.
    ///
    /// # Errors
    /// [`EngineError::NotFound`] for an unknown or evicted job.
    pub fn cancel(&self, id: JobId) -> Result<(), EngineError> {
        self.registry.request_cancel(id).map(|_| ())
    }

    /// Point-in-time status.
    ///
    /// # Errors
    /// [`EngineError::NotFound`] for an unknown or evicted job.
    pub fn status(&self, id: JobId) -> Result<JobStatus, EngineError> {
        Ok(self.registry.get(id)?.status())
    }

    /// Point-in-time snapshot.
    ///
    /// # Errors
    /// [`EngineError::NotFound`] for an unknown or evicted job.
    pub fn job_info(&self, id: JobId) -> Result<JobInfo, EngineError> {
        Ok(self.registry.get(id)?.info())
    }

    /// # Errors
    /// [`EngineError::NotFound`] for an unknown or evicted job.
    pub fn job(&self, id: JobId) -> Result<Arc<Job>, EngineError> {
        self.registry.get(id)
    }

    /// Start the background eviction sweep. Abort the handle to stop it.
    pub fn spawn_reaper(&self) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(&self.registry).run_reaper(self.config.reap_interval))
    }
}
