//! Backpressure-aware streaming analysis of longest monotonic runs.
//!
//! Producers push values into a bounded queue; a background collector forms
//! batches and runs them through a concurrency-limited analyzer that reports the
//! first longest strictly rising and strictly falling run of each batch.
//!
//! ```no_run
//! use monorun_core::{CancelToken, PipelineConfig, SequenceProcessor};
//! use tokio_stream::StreamExt;
//!
//! # async fn demo() -> Result<(), monorun_core::PipelineError> {
//! let processor = SequenceProcessor::<i64>::new(&PipelineConfig::default())?;
//! let mut results = processor.results()?;
//! let cancel = CancelToken::new();
//!
//! for value in [4, 3, 5, 8, 5, 0, 0, -3] {
//!     processor.add(value, &cancel).await;
//! }
//! processor.complete_adding();
//!
//! while let Some(batch) = results.next().await {
//!     println!("{:?}", batch.result.longest_rising);
//! }
//! processor.dispose().await;
//! # Ok(())
//! # }
//! ```

// Safety-focused Clippy lints to keep error handling explicit
#![warn(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::unimplemented,
    clippy::todo
)]
#![deny(clippy::unwrap_in_result, clippy::panic_in_result_fn)]

pub mod analysis;
pub mod cancel;
pub mod config;
pub mod pool;
pub mod reference;
pub mod streaming;

pub use analysis::{
    AnalysisError, AnalysisResult, AnalyzerStats, Direction, Item, SequenceAnalyzer, Window,
    longest_run,
};
pub use cancel::CancelToken;
pub use config::{AnalyzerConfig, ConfigError, MAX_CAPACITY, PipelineConfig, PoolingStrategy};
pub use pool::{BufferPool, PoolStats, PooledBuffer};
pub use streaming::{
    BatchAnalysis, LifecycleState, PipelineError, PipelineStats, ResultStream,
    SequenceProcessor,
};
