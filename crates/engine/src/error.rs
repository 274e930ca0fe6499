//! Engine-level error types.
//!
//! Only [`EngineError`] is ever returned to a caller. The runtime failures
//! ([`VertexExecutionError`], [`CancellationError`]) are reported through the
//! job's event stream instead.

use thiserror::Error;

use crate::job::JobId;

/// The scheduler could not order every vertex.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("graph contains a cycle through: {}", .unsorted.join(", "))]
pub struct CycleError {
    /// Vertices that still had unresolved dependencies, in flow order.
    pub unsorted: Vec<String>,
}

/// A flow definition that cannot be turned into a job.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("vertex ID must not be empty")]
    EmptyVertexId,

    /// Two or more vertices share the same ID.
    #[error("duplicate vertex ID: '{0}'")]
    DuplicateVertexId(String),

    /// An edge references a vertex ID that doesn't exist in the flow.
    #[error("edge references unknown vertex '{vertex_id}' ({side} side)")]
    UnknownVertexReference {
        vertex_id: String,
        side: &'static str,
    },

    /// No node implementation is registered for the vertex's type tag.
    #[error("vertex '{vertex_id}' has unregistered type '{vertex_type}'")]
    UnknownVertexType {
        vertex_id: String,
        vertex_type: String,
    },

    #[error(transparent)]
    Cycle(#[from] CycleError),
}

/// Errors returned synchronously by the [`Engine`](crate::Engine) facade.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid flow: {0}")]
    Validation(#[from] ValidationError),

    #[error("job not found: {0}")]
    NotFound(JobId),
}

impl From<CycleError> for EngineError {
    fn from(err: CycleError) -> Self {
        Self::Validation(err.into())
    }
}

/// A vertex's node failed (returned an error or panicked).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("vertex '{vertex_id}' failed: {message}")]
pub struct VertexExecutionError {
    pub vertex_id: String,
    pub message: String,
}

/// One or more `on_cancel` hooks failed while a job was being cancelled.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("cancellation incomplete: {}", join_failures(.failures))]
pub struct CancellationError {
    pub failures: Vec<VertexExecutionError>,
}

fn join_failures(failures: &[VertexExecutionError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
