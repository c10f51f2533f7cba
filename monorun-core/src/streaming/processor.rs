//! Public facade over the streaming pipeline.
//!
//! ```text
//! producers ──add()──► BoundedQueue ──► BatchCollector ──► SequenceAnalyzer
//!                                             │
//!                                             └──► results() stream
//!
//! callers ──analyze_stream()──► GrowableBuffer ──► SequenceAnalyzer
//! ```
//!
//! Construction spawns the collector on the current tokio runtime. Teardown
//! ([`SequenceProcessor::dispose`]) completes the queue, cancels the collector,
//! waits for it, then disposes the analyzer. Items still queued at that point are
//! dropped. Use [`SequenceProcessor::shutdown`] to give the collector a chance to
//! drain first.
//!
//! The collector drains the queue whether or not anyone reads results. Until
//! [`SequenceProcessor::results`] is called, reports fill the result buffer and
//! later ones are discarded; once the stream is taken, a slow reader slows the
//! collector and, through the queue, the producers.

use super::collector::{BatchAnalysis, BatchCollector};
use super::lifecycle::{Lifecycle, LifecycleState};
use super::queue::{BoundedQueue, QueueError, QueueStats};
use crate::analysis::{AnalysisError, AnalysisResult, AnalyzerStats, Item, SequenceAnalyzer};
use crate::cancel::CancelToken;
use crate::config::{ConfigError, PipelineConfig};
use crate::pool::PoolStats;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::Stream;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info};

/// Lazy, consumer-pulled sequence of batch results.
pub type ResultStream = ReceiverStream<BatchAnalysis>;

/// Errors surfaced by the pipeline facade.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// `add` after `complete_adding`
    #[error("pipeline no longer accepts items")]
    Closed,

    /// The caller's token was cancelled
    #[error("operation cancelled")]
    Cancelled,

    /// The pipeline has been torn down
    #[error("pipeline has been disposed")]
    Disposed,

    /// `results` was already called; the sequence is not restartable
    #[error("result stream has already been taken")]
    ResultsTaken,

    /// Constructed outside a tokio runtime
    #[error("no tokio runtime available to run the batch collector")]
    NoRuntime,

    /// Configuration rejected
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// Graceful shutdown gave up waiting for the queue to drain
    #[error("shutdown timed out after {timeout_ms}ms with {remaining_items} items undrained")]
    ShutdownTimeout {
        /// Items still queued when the deadline passed
        remaining_items: usize,
        /// Deadline that was exceeded
        timeout_ms: u64,
    },
}

impl From<QueueError> for PipelineError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Closed => Self::Closed,
            QueueError::Cancelled => Self::Cancelled,
        }
    }
}

impl From<AnalysisError> for PipelineError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Cancelled => Self::Cancelled,
            AnalysisError::Disposed => Self::Disposed,
        }
    }
}

/// Combined activity snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    /// Queue counters
    pub queue: QueueStats,
    /// Analyzer counters
    pub analyzer: AnalyzerStats,
    /// Buffer pool counters
    pub pool: PoolStats,
}

/// Backpressure-aware monotonic run analysis pipeline.
#[derive(Debug)]
pub struct SequenceProcessor<T: Item> {
    queue: BoundedQueue<T>,
    analyzer: Arc<SequenceAnalyzer<T>>,
    results: Mutex<Option<mpsc::Receiver<BatchAnalysis>>>,
    consumer_attached: Arc<AtomicBool>,
    lifecycle: Lifecycle,
}

impl<T: Item> SequenceProcessor<T> {
    /// Build the pipeline and start its collector on the current runtime.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::InvalidConfig`] for an unusable configuration
    /// - [`PipelineError::NoRuntime`] when called outside a tokio runtime
    pub fn new(config: &PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| PipelineError::NoRuntime)?;

        let analyzer = Arc::new(SequenceAnalyzer::new(&config.analyzer)?);
        let (queue, receiver) = BoundedQueue::new(config.queue_capacity);
        let (results_tx, results_rx) = mpsc::channel(config.result_buffer);
        let lifecycle = Lifecycle::new(CancelToken::new());
        let consumer_attached = Arc::new(AtomicBool::new(false));

        let collector = BatchCollector {
            receiver,
            analyzer: Arc::clone(&analyzer),
            batch_size: config.batch_size,
            results: results_tx,
            consumer_attached: Arc::clone(&consumer_attached),
            shutdown: lifecycle.shutdown_token().clone(),
        };
        lifecycle.attach(runtime.spawn(collector.run()));

        info!(
            analyzer = analyzer.name(),
            queue_capacity = config.queue_capacity,
            batch_size = config.batch_size,
            max_concurrency = analyzer.max_concurrency(),
            "sequence processor started"
        );

        Ok(Self {
            queue,
            analyzer,
            results: Mutex::new(Some(results_rx)),
            consumer_attached,
            lifecycle,
        })
    }

    /// Build the pipeline with default configuration.
    ///
    /// # Errors
    ///
    /// [`PipelineError::NoRuntime`] when called outside a tokio runtime.
    pub fn with_defaults() -> Result<Self, PipelineError> {
        Self::new(&PipelineConfig::default())
    }

    /// Offer an item, suspending while the queue is full.
    ///
    /// Returns whether the item was admitted. Cancellation, completion and
    /// teardown all read as `false`; use [`try_add`](Self::try_add) for the reason.
    pub async fn add(&self, item: T, cancel: &CancelToken) -> bool {
        self.try_add(item, cancel).await.is_ok()
    }

    /// Offer an item, reporting why it was refused.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Disposed`] after teardown has begun
    /// - [`PipelineError::Closed`] after [`complete_adding`](Self::complete_adding)
    /// - [`PipelineError::Cancelled`] if `cancel` fires while waiting for room
    pub async fn try_add(&self, item: T, cancel: &CancelToken) -> Result<(), PipelineError> {
        if self.lifecycle.state() >= LifecycleState::Cancelling {
            return Err(PipelineError::Disposed);
        }
        self.queue.enqueue(item, cancel).await?;
        Ok(())
    }

    /// Stop accepting items; queued items still drain. Idempotent.
    pub fn complete_adding(&self) {
        if self.queue.complete() {
            self.lifecycle.advance(LifecycleState::Draining);
            debug!(queued = self.queue.depth(), "adding completed");
        }
    }

    /// Hand out the result stream.
    ///
    /// The stream ends once adding is complete and every queued item has been
    /// analyzed, or when the pipeline is torn down. It starts with whatever
    /// reports were buffered before the call; reports that overflowed the
    /// buffer while nobody held the stream are not replayed.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Disposed`] after teardown has begun
    /// - [`PipelineError::ResultsTaken`] on every call after the first
    pub fn results(&self) -> Result<ResultStream, PipelineError> {
        if self.lifecycle.state() >= LifecycleState::Cancelling {
            return Err(PipelineError::Disposed);
        }
        let receiver = self.results.lock().take().ok_or(PipelineError::ResultsTaken)?;
        self.consumer_attached.store(true, Ordering::Release);
        Ok(ReceiverStream::new(receiver))
    }

    /// Analyze one batch directly, bypassing the queue.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Disposed`] or [`PipelineError::Cancelled`].
    pub async fn analyze(
        &self,
        batch: &[T],
        cancel: &CancelToken,
    ) -> Result<AnalysisResult, PipelineError> {
        Ok(self.analyzer.analyze(batch, cancel).await?)
    }

    /// Buffer a whole stream and analyze it as one batch.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Disposed`] or [`PipelineError::Cancelled`].
    pub async fn analyze_stream<S>(
        &self,
        source: S,
        cancel: &CancelToken,
    ) -> Result<AnalysisResult, PipelineError>
    where
        S: Stream<Item = T>,
    {
        Ok(self.analyzer.analyze_stream(source, cancel).await?)
    }

    /// Tear the pipeline down. Idempotent; later calls return immediately.
    ///
    /// Completes the queue, cancels the collector, waits for it to stop, then
    /// disposes the analyzer. Queued items not yet drained are dropped.
    pub async fn dispose(&self) {
        let previous = self.lifecycle.advance(LifecycleState::Cancelling);
        if previous >= LifecycleState::Cancelling {
            return;
        }
        let undrained = self.queue.depth();
        self.queue.complete();
        self.lifecycle.shutdown_token().cancel();

        if let Some(handle) = self.lifecycle.take_task() {
            join_collector(handle).await;
        }

        self.analyzer.dispose();
        self.lifecycle.advance(LifecycleState::Stopped);
        info!(undrained, "sequence processor stopped");
    }

    /// Complete adding, let the collector drain for up to `timeout`, then tear down.
    ///
    /// Once the result stream has been taken, draining needs its reader to keep
    /// pulling after the result buffer fills.
    ///
    /// # Errors
    ///
    /// [`PipelineError::ShutdownTimeout`] if items were still queued at the
    /// deadline. Teardown has completed either way.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), PipelineError> {
        self.complete_adding();

        let mut outcome = Ok(());
        if self.lifecycle.state() < LifecycleState::Cancelling {
            if let Some(mut handle) = self.lifecycle.take_task() {
                match tokio::time::timeout(timeout, &mut handle).await {
                    Ok(joined) => log_join(joined),
                    Err(_) => {
                        let remaining_items = self.queue.depth();
                        self.lifecycle.shutdown_token().cancel();
                        join_collector(handle).await;
                        outcome = Err(PipelineError::ShutdownTimeout {
                            remaining_items,
                            timeout_ms: timeout.as_millis().try_into().unwrap_or(u64::MAX),
                        });
                    }
                }
            }
        }

        self.dispose().await;
        outcome
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Items waiting in the queue.
    #[must_use]
    pub fn queue_depth(&self) -> usize {
        self.queue.depth()
    }

    /// The analyzer behind this pipeline.
    #[must_use]
    pub fn analyzer(&self) -> &SequenceAnalyzer<T> {
        &self.analyzer
    }

    /// Combined activity snapshot.
    #[must_use]
    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            queue: self.queue.stats(),
            analyzer: self.analyzer.stats(),
            pool: self.analyzer.pool().stats(),
        }
    }
}

impl<T: Item> Drop for SequenceProcessor<T> {
    fn drop(&mut self) {
        if self.lifecycle.state() < LifecycleState::Stopped {
            self.queue.complete();
            self.lifecycle.shutdown_token().cancel();
            self.analyzer.dispose();
        }
    }
}

async fn join_collector(handle: JoinHandle<()>) {
    log_join(handle.await);
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    match joined {
        Ok(()) => {}
        Err(err) if err.is_cancelled() => debug!("collector task cancelled"),
        Err(err) => error!(error = %err, "collector task panicked"),
    }
}
