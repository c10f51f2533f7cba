//! Permit-gated sequence analyzer.
//!
//! ## Lifecycle
//!
//! An analyzer is live from construction until [`SequenceAnalyzer::dispose`].
//! Disposal closes the permit set, so waiters wake with
//! [`AnalysisError::Disposed`], and every later call fails the same way before
//! doing any work.

use super::limiter::ConcurrencyLimiter;
use super::scan::{Direction, longest_run};
use super::{AnalysisResult, Item};
use crate::cancel::CancelToken;
use crate::config::{AnalyzerConfig, ConfigError};
use crate::pool::BufferPool;
use crate::streaming::adapter;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_stream::Stream;
use tracing::{debug, trace};

/// Errors surfaced by analysis calls.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisError {
    /// The caller's token was cancelled before the analysis finished
    #[error("analysis cancelled")]
    Cancelled,

    /// The analyzer has been disposed
    #[error("analyzer has been disposed")]
    Disposed,
}

/// Snapshot of analyzer activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalyzerStats {
    /// Analyses that produced a result (including empty batches)
    pub analyses: u64,
    /// Analyses abandoned because the caller cancelled
    pub cancelled: u64,
    /// Comparisons performed across all analyses
    pub total_comparisons: u64,
    /// Scan time across all analyses
    pub total_elapsed: Duration,
    /// Analyses holding a permit right now
    pub in_flight: usize,
    /// Highest number of analyses that held permits at once
    pub peak_in_flight: usize,
    /// Times a streaming buffer had to double
    pub buffer_growths: u64,
}

#[derive(Debug, Default)]
struct AnalyzerCounters {
    analyses: AtomicU64,
    cancelled: AtomicU64,
    total_comparisons: AtomicU64,
    total_elapsed_ns: AtomicU64,
    buffer_growths: AtomicU64,
}

/// Computes longest rising and descending runs, at most `max_concurrency` at a time.
#[derive(Debug)]
pub struct SequenceAnalyzer<T: Item> {
    name: String,
    limiter: ConcurrencyLimiter,
    pool: Arc<BufferPool<T>>,
    initial_stream_capacity: usize,
    disposed: AtomicBool,
    counters: AnalyzerCounters,
}

impl<T: Item> SequenceAnalyzer<T> {
    /// Create an analyzer with its own buffer pool.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid.
    pub fn new(config: &AnalyzerConfig) -> Result<Self, ConfigError> {
        let pool = BufferPool::new(config.pooling.max_retained_per_bucket());
        Self::with_pool(config, pool)
    }

    /// Create an analyzer that rents stream buffers from a shared pool.
    ///
    /// The pooling strategy in `config` is ignored; the shared pool's retention
    /// policy applies instead.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid.
    pub fn with_pool(config: &AnalyzerConfig, pool: Arc<BufferPool<T>>) -> Result<Self, ConfigError> {
        config.validate()?;
        let max_concurrency = config.resolved_max_concurrency();
        debug!(
            analyzer = %config.name,
            max_concurrency,
            initial_stream_capacity = config.initial_stream_capacity,
            "sequence analyzer created"
        );

        Ok(Self {
            name: config.name.clone(),
            limiter: ConcurrencyLimiter::new(max_concurrency),
            pool,
            initial_stream_capacity: config.initial_stream_capacity,
            disposed: AtomicBool::new(false),
            counters: AnalyzerCounters::default(),
        })
    }

    /// Analyze one batch.
    ///
    /// Empty batches return [`AnalysisResult::EMPTY`] without taking a permit.
    /// Otherwise one permit is held for the duration of both scans and released
    /// on every exit path.
    ///
    /// # Errors
    ///
    /// - [`AnalysisError::Disposed`] if the analyzer is (or becomes, while
    ///   waiting for a permit) disposed
    /// - [`AnalysisError::Cancelled`] if `cancel` fires before the result is ready
    pub async fn analyze(
        &self,
        batch: &[T],
        cancel: &CancelToken,
    ) -> Result<AnalysisResult, AnalysisError> {
        self.ensure_live()?;

        if batch.is_empty() {
            self.counters.analyses.fetch_add(1, Ordering::Relaxed);
            return Ok(AnalysisResult::EMPTY);
        }

        let _permit = match self.limiter.acquire(cancel).await {
            Ok(permit) => permit,
            Err(err) => return Err(self.note_failure(err)),
        };

        let started = Instant::now();
        let (longest_rising, rising_comparisons) = longest_run(batch, Direction::Rising);
        if cancel.is_cancelled() {
            return Err(self.note_failure(AnalysisError::Cancelled));
        }
        let (longest_descending, descending_comparisons) = longest_run(batch, Direction::Falling);
        let elapsed = started.elapsed();

        let result = AnalysisResult {
            longest_rising,
            longest_descending,
            total_comparisons: rising_comparisons + descending_comparisons,
            elapsed,
        };
        self.record(&result);

        trace!(
            analyzer = %self.name,
            len = batch.len(),
            rising = ?result.longest_rising,
            descending = ?result.longest_descending,
            elapsed_us = elapsed.as_micros(),
            "batch analyzed"
        );

        Ok(result)
    }

    /// Buffer a whole stream, then analyze it as a single batch.
    ///
    /// The stream is accumulated into a pooled buffer that doubles whenever it
    /// fills. The buffer goes back to the pool however this call ends.
    ///
    /// # Errors
    ///
    /// Same as [`analyze`](Self::analyze); cancellation is also honoured while
    /// the stream is being drained.
    pub async fn analyze_stream<S>(
        &self,
        source: S,
        cancel: &CancelToken,
    ) -> Result<AnalysisResult, AnalysisError>
    where
        S: Stream<Item = T>,
    {
        self.ensure_live()?;

        let buffer =
            match adapter::collect(&self.pool, self.initial_stream_capacity, source, cancel).await
            {
                Ok(buffer) => buffer,
                Err(err) => return Err(self.note_failure(err)),
            };
        self.counters
            .buffer_growths
            .fetch_add(buffer.growths(), Ordering::Relaxed);

        debug!(
            analyzer = %self.name,
            len = buffer.len(),
            capacity = buffer.capacity(),
            growths = buffer.growths(),
            "stream buffered"
        );

        self.analyze(buffer.as_slice(), cancel).await
    }

    /// Stop accepting work. Idempotent.
    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            self.limiter.close();
            debug!(analyzer = %self.name, "sequence analyzer disposed");
        }
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Name given in the configuration.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Concurrency limit in effect.
    #[must_use]
    pub const fn max_concurrency(&self) -> usize {
        self.limiter.capacity()
    }

    /// Pool used for stream and batch buffers.
    #[must_use]
    pub const fn pool(&self) -> &Arc<BufferPool<T>> {
        &self.pool
    }

    /// Current activity counters.
    #[must_use]
    pub fn stats(&self) -> AnalyzerStats {
        AnalyzerStats {
            analyses: self.counters.analyses.load(Ordering::Relaxed),
            cancelled: self.counters.cancelled.load(Ordering::Relaxed),
            total_comparisons: self.counters.total_comparisons.load(Ordering::Relaxed),
            total_elapsed: Duration::from_nanos(
                self.counters.total_elapsed_ns.load(Ordering::Relaxed),
            ),
            in_flight: self.limiter.in_flight(),
            peak_in_flight: self.limiter.peak_in_flight(),
            buffer_growths: self.counters.buffer_growths.load(Ordering::Relaxed),
        }
    }

    fn ensure_live(&self) -> Result<(), AnalysisError> {
        if self.is_disposed() {
            Err(AnalysisError::Disposed)
        } else {
            Ok(())
        }
    }

    fn record(&self, result: &AnalysisResult) {
        let elapsed_ns = result.elapsed.as_nanos().try_into().unwrap_or(u64::MAX);
        self.counters.analyses.fetch_add(1, Ordering::Relaxed);
        self.counters
            .total_comparisons
            .fetch_add(result.total_comparisons, Ordering::Relaxed);
        self.counters
            .total_elapsed_ns
            .fetch_add(elapsed_ns, Ordering::Relaxed);
    }

    fn note_failure(&self, err: AnalysisError) -> AnalysisError {
        if err == AnalysisError::Cancelled {
            self.counters.cancelled.fetch_add(1, Ordering::Relaxed);
        }
        err
    }
}
