//! Accumulates an unbounded stream into a pooled, doubling buffer.
//!
//! ```text
//! source ──next()──► GrowableBuffer ──full?──► rent 2x ─► copy ─► return old
//!                          │
//!                  exhausted│
//!                          ▼
//!                 analyze(as_slice())
//! ```
//!
//! Doubling keeps total copy work linear in the final length. At any moment the
//! arena owns exactly one pooled buffer; the previous buffer is handed back to
//! the pool as soon as its contents have been copied, before anything new is
//! written.

use crate::analysis::AnalysisError;
use crate::cancel::CancelToken;
use crate::pool::{BufferPool, PooledBuffer};
use std::sync::Arc;
use tokio_stream::{Stream, StreamExt};

/// Growable arena built from fixed-capacity pooled buffers.
#[derive(Debug)]
pub struct GrowableBuffer<T: Copy + Send + 'static> {
    current: PooledBuffer<T>,
    pool: Arc<BufferPool<T>>,
    growths: u64,
}

impl<T: Copy + Send + 'static> GrowableBuffer<T> {
    /// Rent the first buffer with room for at least `initial_capacity` items.
    #[must_use]
    pub fn new(pool: &Arc<BufferPool<T>>, initial_capacity: usize) -> Self {
        Self {
            current: pool.rent(initial_capacity),
            pool: Arc::clone(pool),
            growths: 0,
        }
    }

    /// Append an item, doubling the backing buffer first if it is full.
    pub fn push(&mut self, item: T) {
        let mut pending = item;
        loop {
            match self.current.try_push(pending) {
                Ok(()) => return,
                Err(rejected) => {
                    pending = rejected;
                    self.grow();
                }
            }
        }
    }

    fn grow(&mut self) {
        let next_capacity = self.current.capacity().saturating_mul(2);
        let mut next = self.pool.rent(next_capacity);
        next.extend_from_slice(self.current.as_slice());
        let previous = std::mem::replace(&mut self.current, next);
        drop(previous);
        self.growths += 1;
    }

    /// Filled region.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        self.current.as_slice()
    }

    /// Number of items appended.
    #[must_use]
    pub fn len(&self) -> usize {
        self.current.len()
    }

    /// Whether nothing has been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Capacity of the buffer currently held.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.current.capacity()
    }

    /// How many times the buffer doubled.
    #[must_use]
    pub const fn growths(&self) -> u64 {
        self.growths
    }
}

/// Drain `source` into a [`GrowableBuffer`].
///
/// # Errors
///
/// Returns [`AnalysisError::Cancelled`] if `cancel` fires before the source is
/// exhausted. The partially filled buffer is returned to the pool.
pub async fn collect<T, S>(
    pool: &Arc<BufferPool<T>>,
    initial_capacity: usize,
    source: S,
    cancel: &CancelToken,
) -> Result<GrowableBuffer<T>, AnalysisError>
where
    T: Copy + Send + 'static,
    S: Stream<Item = T>,
{
    let mut buffer = GrowableBuffer::new(pool, initial_capacity);
    tokio::pin!(source);

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AnalysisError::Cancelled),
            next = source.next() => next,
        };
        match next {
            Some(item) => buffer.push(item),
            None => return Ok(buffer),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_push_doubles_and_preserves_order() {
        let pool = BufferPool::<u32>::new(4);
        let mut buffer = GrowableBuffer::new(&pool, 16);

        for value in 0..100 {
            buffer.push(value);
        }

        assert_eq!(buffer.len(), 100);
        assert_eq!(buffer.capacity(), 128);
        assert_eq!(buffer.growths(), 3);
        assert!(buffer.as_slice().iter().copied().eq(0..100));
        // Only the live buffer is outstanding; the outgrown ones went back.
        assert_eq!(pool.stats().outstanding(), 1);

        drop(buffer);
        assert_eq!(pool.stats().outstanding(), 0);
    }

    #[tokio::test]
    async fn test_collect_five_thousand_items_from_default_capacity() {
        let pool = BufferPool::<i32>::new(4);
        let source = tokio_stream::iter(0..5000);

        let buffer = collect(&pool, 4096, source, &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(buffer.len(), 5000);
        assert_eq!(buffer.capacity(), 8192);
        assert_eq!(buffer.growths(), 1);
    }

    #[tokio::test]
    async fn test_collect_empty_source() {
        let pool = BufferPool::<i32>::new(4);

        let buffer = collect(&pool, 16, tokio_stream::empty(), &CancelToken::new())
            .await
            .unwrap();

        assert!(buffer.is_empty());
        assert_eq!(buffer.growths(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_collect_returns_buffer() {
        let pool = BufferPool::<i32>::new(4);
        let cancel = CancelToken::new();
        let source = tokio_stream::iter(0..10).chain(tokio_stream::pending());

        let task = {
            let pool = Arc::clone(&pool);
            let cancel = cancel.clone();
            tokio::spawn(async move { collect(&pool, 16, source, &cancel).await.map(drop) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        assert_eq!(task.await.unwrap(), Err(AnalysisError::Cancelled));
        assert_eq!(pool.stats().outstanding(), 0);
    }
}
