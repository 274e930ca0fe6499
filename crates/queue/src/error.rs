//! Queue-level error type.

use thiserror::Error;

/// Returned by [`EventBus::emit`](crate::EventBus::emit) once the bus has been
/// closed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("event bus is closed")]
pub struct BusClosed;
