//! Bounded multi-producer, single-consumer queue with explicit completion.
//!
//! Built on `tokio::sync::mpsc`. Producers reserve a slot before handing over an
//! item, so a producer that is cancelled while the queue is full never loses or
//! half-delivers its item. The single consumer is enforced by ownership: the
//! [`QueueReceiver`] is not `Clone`.
//!
//! Completion is a signal as well as a state change: producers already waiting
//! for room when [`BoundedQueue::complete`] runs are woken and refused.
//!
//! Ordering is FIFO over the combined arrival order of all producers. No
//! per-producer fairness is promised beyond that.

use crate::cancel::CancelToken;
use crate::config::MAX_CAPACITY;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors returned by [`BoundedQueue::enqueue`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The queue was completed, or its consumer is gone
    #[error("queue is closed to new items")]
    Closed,

    /// The producer's token was cancelled before a slot became free
    #[error("enqueue cancelled while waiting for capacity")]
    Cancelled,
}

/// Snapshot of queue activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Items waiting to be drained
    pub depth: usize,
    /// Configured capacity
    pub capacity: usize,
    /// Items admitted (lifetime)
    pub enqueued: u64,
    /// Items drained (lifetime)
    pub dequeued: u64,
}

#[derive(Debug)]
struct QueueShared {
    capacity: usize,
    depth: AtomicUsize,
    enqueued: AtomicU64,
    dequeued: AtomicU64,
}

/// Producer side of the queue. Shareable by reference across producers.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    sender: Mutex<Option<mpsc::Sender<T>>>,
    completed: CancelToken,
    shared: Arc<QueueShared>,
}

/// Consumer side of the queue.
#[derive(Debug)]
pub struct QueueReceiver<T> {
    receiver: mpsc::Receiver<T>,
    shared: Arc<QueueShared>,
}

impl<T: Send> BoundedQueue<T> {
    /// Create a queue holding `capacity` items, clamped to `1..=MAX_CAPACITY`.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, QueueReceiver<T>) {
        let capacity = capacity.clamp(1, MAX_CAPACITY);
        let (sender, receiver) = mpsc::channel(capacity);
        let shared = Arc::new(QueueShared {
            capacity,
            depth: AtomicUsize::new(0),
            enqueued: AtomicU64::new(0),
            dequeued: AtomicU64::new(0),
        });

        (
            Self {
                sender: Mutex::new(Some(sender)),
                completed: CancelToken::new(),
                shared: Arc::clone(&shared),
            },
            QueueReceiver { receiver, shared },
        )
    }

    /// Add an item, suspending while the queue is full.
    ///
    /// # Errors
    ///
    /// - [`QueueError::Closed`] after [`complete`](Self::complete), including
    ///   when completion happens while waiting for room, or if the receiver has
    ///   been dropped
    /// - [`QueueError::Cancelled`] if `cancel` fires before a slot frees up; the
    ///   item is dropped and the queue is unchanged
    pub async fn enqueue(&self, item: T, cancel: &CancelToken) -> Result<(), QueueError> {
        let sender = self.sender.lock().clone().ok_or(QueueError::Closed)?;

        let permit = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(QueueError::Cancelled),
            () = self.completed.cancelled() => return Err(QueueError::Closed),
            permit = sender.reserve() => permit.map_err(|_| QueueError::Closed)?,
        };

        // Counted before the send so the consumer never observes an item it
        // has not been told about.
        self.shared.depth.fetch_add(1, Ordering::AcqRel);
        self.shared.enqueued.fetch_add(1, Ordering::Relaxed);
        permit.send(item);
        Ok(())
    }

    /// Stop admitting items. Already queued items stay drainable.
    ///
    /// Returns `true` for the call that actually completed the queue.
    pub fn complete(&self) -> bool {
        let completed = self.sender.lock().take().is_some();
        self.completed.cancel();
        completed
    }

    /// Whether [`complete`](Self::complete) has been called.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Items waiting to be drained.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.shared.depth.load(Ordering::Acquire)
    }

    /// Current activity counters.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            depth: self.depth(),
            capacity: self.shared.capacity,
            enqueued: self.shared.enqueued.load(Ordering::Relaxed),
            dequeued: self.shared.dequeued.load(Ordering::Relaxed),
        }
    }
}

impl<T: Send> QueueReceiver<T> {
    /// Wait until an item is available and take it.
    ///
    /// Returns `None` once the queue is completed and fully drained.
    pub async fn recv(&mut self) -> Option<T> {
        let item = self.receiver.recv().await?;
        self.note_dequeued();
        Some(item)
    }

    /// Take an item if one is immediately available.
    pub fn try_recv(&mut self) -> Option<T> {
        let item = self.receiver.try_recv().ok()?;
        self.note_dequeued();
        Some(item)
    }

    /// Items waiting to be drained.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.shared.depth.load(Ordering::Acquire)
    }

    fn note_dequeued(&self) {
        self.shared.depth.fetch_sub(1, Ordering::AcqRel);
        self.shared.dequeued.fetch_add(1, Ordering::Relaxed);
    }
}
