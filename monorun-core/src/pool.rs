//! Pool of reusable fixed-capacity buffers.
//!
//! Buffers are grouped into power-of-two size classes. Each class keeps its idle
//! buffers in a lock-free `SegQueue`, so renting and returning never take a lock.
//!
//! A rented buffer is a [`PooledBuffer`]: it owns its storage exclusively and hands
//! it back to the pool when dropped. Because return happens in `Drop`, every exit
//! path (success, `?`, cancellation of the owning future) returns the buffer exactly
//! once, and the type system rules out touching it afterwards.
//!
//! A `PooledBuffer` never reallocates. Pushing into a full buffer hands the item
//! back to the caller, who decides how to grow (see `streaming::adapter`).

use crossbeam_queue::SegQueue;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Smallest size class (2^4 = 16 elements).
const MIN_CLASS_SHIFT: u32 = 4;

/// Largest pooled size class (2^30 elements). Larger requests are never retained.
const MAX_CLASS_SHIFT: u32 = 30;

const CLASS_COUNT: usize = (MAX_CLASS_SHIFT - MIN_CLASS_SHIFT + 1) as usize;

/// Idle buffers of one size class.
struct SizeClass<T> {
    idle: SegQueue<Vec<T>>,
    retained: AtomicUsize,
}

impl<T> SizeClass<T> {
    const fn new() -> Self {
        Self {
            idle: SegQueue::new(),
            retained: AtomicUsize::new(0),
        }
    }
}

/// Snapshot of pool activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Buffers handed out (lifetime)
    pub rented: u64,
    /// Buffers handed back (lifetime)
    pub returned: u64,
    /// Rents that had to allocate fresh storage
    pub allocated: u64,
    /// Rents satisfied from an idle buffer
    pub reused: u64,
}

impl PoolStats {
    /// Buffers currently rented and not yet returned.
    #[must_use]
    pub const fn outstanding(&self) -> u64 {
        self.rented.saturating_sub(self.returned)
    }
}

/// Thread-safe pool of reusable buffers.
pub struct BufferPool<T> {
    classes: Vec<SizeClass<T>>,
    max_retained_per_class: usize,
    rented: AtomicU64,
    returned: AtomicU64,
    allocated: AtomicU64,
    reused: AtomicU64,
}

impl<T: Send + 'static> BufferPool<T> {
    /// Create a pool that keeps at most `max_retained_per_class` idle buffers per
    /// size class. Zero disables retention: every rent allocates.
    #[must_use]
    pub fn new(max_retained_per_class: usize) -> Arc<Self> {
        Arc::new(Self {
            classes: (0..CLASS_COUNT).map(|_| SizeClass::new()).collect(),
            max_retained_per_class,
            rented: AtomicU64::new(0),
            returned: AtomicU64::new(0),
            allocated: AtomicU64::new(0),
            reused: AtomicU64::new(0),
        })
    }

    /// Rent a buffer able to hold at least `min_capacity` elements.
    ///
    /// The returned buffer is empty; its capacity is `min_capacity` rounded up to
    /// the next size class.
    #[must_use]
    pub fn rent(self: &Arc<Self>, min_capacity: usize) -> PooledBuffer<T> {
        let capacity = size_class_capacity(min_capacity);
        self.rented.fetch_add(1, Ordering::Relaxed);

        let recycled = class_index(capacity).and_then(|index| {
            let class = &self.classes[index];
            let data = class.idle.pop()?;
            class.retained.fetch_sub(1, Ordering::Relaxed);
            Some(data)
        });

        let data = if let Some(data) = recycled {
            self.reused.fetch_add(1, Ordering::Relaxed);
            data
        } else {
            self.allocated.fetch_add(1, Ordering::Relaxed);
            Vec::with_capacity(capacity)
        };

        PooledBuffer {
            data,
            capacity,
            pool: Arc::clone(self),
        }
    }

    /// Current activity counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            rented: self.rented.load(Ordering::Relaxed),
            returned: self.returned.load(Ordering::Relaxed),
            allocated: self.allocated.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
        }
    }

    /// Number of idle buffers currently held across all size classes.
    #[must_use]
    pub fn idle_buffers(&self) -> usize {
        self.classes
            .iter()
            .map(|class| class.retained.load(Ordering::Relaxed))
            .sum()
    }

    fn give_back(&self, mut data: Vec<T>, capacity: usize) {
        self.returned.fetch_add(1, Ordering::Relaxed);
        data.clear();

        let Some(index) = class_index(capacity) else {
            return;
        };
        let class = &self.classes[index];
        let reserved = class
            .retained
            .fetch_update(Ordering::AcqRel, Ordering::Relaxed, |held| {
                (held < self.max_retained_per_class).then_some(held + 1)
            });
        if reserved.is_ok() {
            class.idle.push(data);
        }
    }
}

impl<T> fmt::Debug for BufferPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("max_retained_per_class", &self.max_retained_per_class)
            .field("rented", &self.rented.load(Ordering::Relaxed))
            .field("returned", &self.returned.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

fn size_class_capacity(min_capacity: usize) -> usize {
    min_capacity
        .max(1 << MIN_CLASS_SHIFT)
        .checked_next_power_of_two()
        .unwrap_or(min_capacity)
}

fn class_index(capacity: usize) -> Option<usize> {
    if !capacity.is_power_of_two() {
        return None;
    }
    let shift = capacity.trailing_zeros();
    (MIN_CLASS_SHIFT..=MAX_CLASS_SHIFT)
        .contains(&shift)
        .then(|| (shift - MIN_CLASS_SHIFT) as usize)
}

/// Exclusively owned buffer rented from a [`BufferPool`].
///
/// Capacity is fixed for the lifetime of the rent. The storage goes back to the
/// pool when this value is dropped.
pub struct PooledBuffer<T: Send + 'static> {
    data: Vec<T>,
    capacity: usize,
    pool: Arc<BufferPool<T>>,
}

impl<T: Send + 'static> PooledBuffer<T> {
    /// Number of filled elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether no elements are filled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Fixed capacity of this buffer.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether another push would be rejected.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.data.len() >= self.capacity
    }

    /// Append `item` if there is room, otherwise hand it back.
    ///
    /// # Errors
    ///
    /// Returns the item unchanged when the buffer is full.
    pub fn try_push(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        self.data.push(item);
        Ok(())
    }

    /// Filled region.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Drop all filled elements, keeping the storage.
    pub fn clear(&mut self) {
        self.data.clear();
    }
}

impl<T: Copy + Send + 'static> PooledBuffer<T> {
    /// Copy as much of `items` as fits; returns the number copied.
    pub fn extend_from_slice(&mut self, items: &[T]) -> usize {
        let room = self.capacity - self.data.len();
        let take = room.min(items.len());
        self.data.extend_from_slice(&items[..take]);
        take
    }
}

impl<T: Send + 'static> Drop for PooledBuffer<T> {
    fn drop(&mut self) {
        let data = std::mem::take(&mut self.data);
        self.pool.give_back(data, self.capacity);
    }
}

impl<T: Send + fmt::Debug + 'static> fmt::Debug for PooledBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("len", &self.data.len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
