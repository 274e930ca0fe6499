//! `queue` crate — a bounded, replayable, multi-reader event log.
//!
//! An [`EventBus`] has exactly one producer and any number of
//! [`Subscription`]s. Every item is retained so a reader attaching late (even
//! after the bus is closed) replays the full history; readers never skip or
//! lose items. The producer is throttled by the slowest attached reader once
//! that reader falls `capacity` items behind.

pub mod bus;
pub mod error;

pub use bus::{EventBus, Subscription};
pub use error::BusClosed;
