//! `nodes` crate — the `ExecutableNode` trait, the type-tag registry, and
//! built-in vertex kinds.
//!
//! The engine treats every vertex as an opaque unit of work: it looks the
//! vertex's type tag up in a [`NodeRegistry`] and dispatches through the
//! [`ExecutableNode`] trait object. Nothing in the engine knows what a
//! concrete node does.

pub mod builtin;
pub mod error;
pub mod mock;
pub mod registry;
pub mod traits;

pub use error::NodeError;
pub use registry::NodeRegistry;
pub use traits::{ExecutableNode, ExecutionContext, Inputs};
