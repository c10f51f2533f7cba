//! Streaming pipeline: bounded intake, background batching, result stream.
//!
//! ## Flow
//!
//! 1. **Intake**: producers call `add`; a full queue suspends them (backpressure)
//! 2. **Batching**: one collector drains up to `batch_size` ready items at a time
//! 3. **Analysis**: each batch goes through the shared, concurrency-limited analyzer
//! 4. **Results**: one [`BatchAnalysis`] per batch, in batch-formation order
//!
//! ## Lifecycle
//!
//! `Running` → `Draining` (adding completed) → `Cancelling` (teardown) → `Stopped`.
//!
//! Unbounded sources bypass the queue entirely: `analyze_stream` buffers them into
//! a pooled [`GrowableBuffer`] and analyzes the whole sequence as one batch.

pub mod adapter;
pub mod collector;
pub mod lifecycle;
pub mod processor;
pub mod queue;

pub use adapter::{GrowableBuffer, collect};
pub use collector::BatchAnalysis;
pub use lifecycle::LifecycleState;
pub use processor::{PipelineError, PipelineStats, ResultStream, SequenceProcessor};
pub use queue::{BoundedQueue, QueueError, QueueReceiver, QueueStats};
