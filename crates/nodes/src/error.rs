//! Node-level error type.

use thiserror::Error;

/// Errors returned by a node's `execute` or `on_cancel` method.
///
/// The engine never retries: any error aborts the job. Retry policy, if a
/// node wants one, lives inside the node.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NodeError {
    /// The node ran and failed.
    #[error("node failed: {0}")]
    Failed(String),

    /// The vertex configuration is not what this node kind expects.
    #[error("invalid node config: {0}")]
    InvalidConfig(String),
}
