//! The event bus and its subscriptions.
//!
//! State lives behind a single mutex; two [`Notify`]s wake the sides:
//! `published` wakes readers when an item is appended or the bus closes,
//! `drained` wakes the producer when a reader advances or detaches.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::stream::{self, Stream};
use tokio::sync::Notify;
use tracing::trace;

use crate::BusClosed;

struct State<T> {
    log: Vec<T>,
    closed: bool,
    /// reader id → offset of the next item that reader will receive.
    readers: HashMap<u64, usize>,
    next_reader: u64,
}

impl<T> State<T> {
    /// How far the slowest attached reader trails the head of the log.
    fn lag(&self) -> usize {
        self.readers
            .values()
            .min()
            .map_or(0, |slowest| self.log.len().saturating_sub(*slowest))
    }
}

struct Shared<T> {
    state: Mutex<State<T>>,
    published: Notify,
    drained: Notify,
    capacity: usize,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Single-producer, multi-reader, append-only event log.
pub struct EventBus<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Clone> EventBus<T> {
    /// Create a bus whose producer may run at most `capacity` items ahead of
    /// the slowest attached reader. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    log: Vec::new(),
                    closed: false,
                    readers: HashMap::new(),
                    next_reader: 0,
                }),
                published: Notify::new(),
                drained: Notify::new(),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Append `item` and return its offset.
    ///
    /// Waits while an attached reader is `capacity` or more items behind.
    /// With no reader attached the item is retained for replay without
    /// waiting.
    ///
    /// # Errors
    /// [`BusClosed`] if [`close`](Self::close) has been called.
    pub async fn emit(&self, item: T) -> Result<usize, BusClosed> {
        loop {
            let drained = self.shared.drained.notified();
            {
                let mut state = self.shared.lock();
                if state.closed {
                    return Err(BusClosed);
                }
                if state.lag() < self.shared.capacity {
                    let offset = state.log.len();
                    state.log.push(item);
                    drop(state);
                    self.shared.published.notify_waiters();
                    return Ok(offset);
                }
                trace!(capacity = self.shared.capacity, "event bus full, waiting for readers");
            }
            drained.await;
        }
    }

    /// Mark the end of the log. Readers drain what is left and then finish.
    /// Closing twice is harmless.
    pub fn close(&self) {
        self.shared.lock().closed = true;
        self.shared.published.notify_waiters();
        self.shared.drained.notify_waiters();
    }

    /// Attach a reader that replays the log from the beginning.
    pub fn subscribe(&self) -> Subscription<T> {
        self.subscribe_from(0)
    }

    /// Attach a reader whose first item is the one at `offset`. An offset
    /// past the end waits for that item; on a closed bus it yields nothing.
    pub fn subscribe_from(&self, offset: usize) -> Subscription<T> {
        let mut state = self.shared.lock();
        let id = state.next_reader;
        state.next_reader += 1;
        state.readers.insert(id, offset);

        Subscription {
            shared: Arc::clone(&self.shared),
            id,
            cursor: offset,
        }
    }

    /// Copy of everything emitted so far.
    pub fn history(&self) -> Vec<T> {
        self.shared.lock().log.clone()
    }
}

impl<T> EventBus<T> {
    pub fn len(&self) -> usize {
        self.shared.lock().log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    /// Number of subscriptions currently attached.
    pub fn reader_count(&self) -> usize {
        self.shared.lock().readers.len()
    }

    /// Attached readers that have not yet received every item emitted so far.
    pub fn undrained_reader_count(&self) -> usize {
        let state = self.shared.lock();
        state
            .readers
            .values()
            .filter(|cursor| **cursor < state.log.len())
            .count()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }
}

impl<T> fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("EventBus")
            .field("len", &state.log.len())
            .field("closed", &state.closed)
            .field("readers", &state.readers.len())
            .field("capacity", &self.shared.capacity)
            .finish()
    }
}

/// A reader attached to an [`EventBus`].
///
/// Dropping it detaches the reader, so it no longer holds the producer back.
pub struct Subscription<T> {
    shared: Arc<Shared<T>>,
    id: u64,
    cursor: usize,
}

impl<T: Clone> Subscription<T> {
    /// Next item in log order, or `None` once the bus is closed and drained.
    pub async fn next(&mut self) -> Option<T> {
        loop {
            let published = self.shared.published.notified();
            {
                let mut state = self.shared.lock();
                if let Some(item) = state.log.get(self.cursor).cloned() {
                    self.cursor += 1;
                    state.readers.insert(self.id, self.cursor);
                    drop(state);
                    self.shared.drained.notify_waiters();
                    return Some(item);
                }
                if state.closed {
                    return None;
                }
            }
            published.await;
        }
    }

    /// Drain every remaining item until the bus closes.
    pub async fn collect(mut self) -> Vec<T> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await {
            items.push(item);
        }
        items
    }

    /// Adapt into a [`Stream`] that ends when the bus closes.
    pub fn into_stream(self) -> impl Stream<Item = T> + Send + 'static
    where
        T: Send + 'static,
    {
        stream::unfold(self, |mut sub| async move {
            let item = sub.next().await?;
            Some((item, sub))
        })
    }
}

impl<T> Subscription<T> {
    /// Offset of the next item this reader will receive.
    pub fn offset(&self) -> usize {
        self.cursor
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.shared.lock().readers.remove(&self.id);
        self.shared.drained.notify_waiters();
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("offset", &self.cursor)
            .finish()
    }
}
