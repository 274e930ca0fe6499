//! `engine` crate — flow models, graph validation, scheduling, and the
//! asynchronous job engine.
//!
//! A [`Flow`] is validated into an [`ExecutionPlan`] (graph + deterministic
//! order), wrapped in a [`Job`] owned by the [`JobRegistry`], and driven to a
//! terminal status by a [`JobExecutor`] on its own task. Progress is
//! published as [`JobEvent`]s on the job's event bus. [`Engine`] is the
//! facade tying these together.

pub mod config;
pub mod error;
pub mod events;
pub mod executor;
pub mod graph;
pub mod job;
pub mod models;
pub mod registry;
pub mod scheduler;
pub mod service;

pub use config::EngineConfig;
pub use error::{
    CancellationError, CycleError, EngineError, ValidationError, VertexExecutionError,
};
pub use events::{EndPayload, EventKind, JobEvent};
pub use executor::JobExecutor;
pub use graph::Graph;
pub use job::{Job, JobId, JobInfo, JobStatus};
pub use models::{Edge, Flow, Vertex};
pub use registry::JobRegistry;
pub use scheduler::{topological_order, ExecutionPlan};
pub use service::{Engine, EventSubscription};
