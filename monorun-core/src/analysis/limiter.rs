//! Counting permit set bounding simultaneous analyses.

use super::analyzer::AnalysisError;
use crate::cancel::CancelToken;
use crate::config::MAX_CAPACITY;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Semaphore, SemaphorePermit};

/// Permit set with in-flight instrumentation.
///
/// Permits are scoped: a [`LimiterPermit`] releases its slot when dropped, so the
/// slot comes back on every exit path of the holder.
#[derive(Debug)]
pub struct ConcurrencyLimiter {
    semaphore: Semaphore,
    capacity: usize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ConcurrencyLimiter {
    /// Create a limiter admitting `capacity` holders at once, clamped to
    /// `1..=MAX_CAPACITY`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_CAPACITY);
        Self {
            semaphore: Semaphore::new(capacity),
            capacity,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Wait for a permit.
    ///
    /// # Errors
    ///
    /// - [`AnalysisError::Cancelled`] if `cancel` fires first (checked before
    ///   a permit is taken, even if one is free)
    /// - [`AnalysisError::Disposed`] if the limiter has been closed
    pub async fn acquire(&self, cancel: &CancelToken) -> Result<LimiterPermit<'_>, AnalysisError> {
        let permit = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AnalysisError::Cancelled),
            permit = self.semaphore.acquire() => permit.map_err(|_| AnalysisError::Disposed)?,
        };

        let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::AcqRel);

        Ok(LimiterPermit {
            _permit: permit,
            in_flight: &self.in_flight,
        })
    }

    /// Refuse all current and future waiters. Idempotent.
    pub fn close(&self) {
        self.semaphore.close();
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    /// Configured number of permits.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held.
    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Holders right now.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Highest number of simultaneous holders observed.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::Acquire)
    }
}

/// Scoped permit; releases its slot on drop.
#[derive(Debug)]
pub struct LimiterPermit<'a> {
    _permit: SemaphorePermit<'a>,
    in_flight: &'a AtomicUsize,
}

impl Drop for LimiterPermit<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}
