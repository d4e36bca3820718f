//! Distribution channel between the source adapter and the push workers
//!
//! A bounded tokio mpsc channel whose receiving end is shared by all workers
//! behind an async mutex. Whichever worker holds the lock when an item
//! arrives takes it, so every item reaches exactly one worker.
//!
//! When the workers fall behind, the buffer fills up and `Producer::send`
//! waits for a free slot. The adapter stops pulling from its source during
//! that time; nothing is dropped inside the channel.
//!
//! Dropping the producer closes the channel. Workers drain what is left and
//! then see `None`.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Returned when every receiver is gone; carries the unsent item back
#[derive(Debug, PartialEq)]
pub struct ChannelClosed<T>(pub T);

impl<T> std::fmt::Display for ChannelClosed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "distribution channel closed")
    }
}

impl<T: std::fmt::Debug> std::error::Error for ChannelClosed<T> {}

/// Create a channel holding at most `capacity` undelivered items
pub fn distribution_channel<T>(capacity: usize) -> (Producer<T>, SharedReceiver<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        Producer { tx, capacity },
        SharedReceiver {
            inner: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Sending half, owned by the single source adapter
pub struct Producer<T> {
    tx: mpsc::Sender<T>,
    capacity: usize,
}

impl<T> Producer<T> {
    /// Enqueue an item, waiting for space if the buffer is full
    pub async fn send(&self, item: T) -> Result<(), ChannelClosed<T>> {
        self.tx.send(item).await.map_err(|e| ChannelClosed(e.0))
    }

    /// Items currently buffered and not yet taken by a worker
    pub fn depth(&self) -> usize {
        self.capacity - self.tx.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// More than half of the buffer is in use
    pub fn is_congested(&self) -> bool {
        self.depth() > self.capacity / 2
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half, cloned once per worker
pub struct SharedReceiver<T> {
    inner: Arc<Mutex<mpsc::Receiver<T>>>,
}

impl<T> Clone for SharedReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> SharedReceiver<T> {
    /// Take the next item; `None` once the channel is closed and drained
    pub async fn recv(&self) -> Option<T> {
        let mut rx = self.inner.lock().await;
        rx.recv().await
    }
}
