//! Monotonic run analysis.
//!
//! A batch is scanned twice, once for the longest strictly rising run and once for
//! the longest strictly falling run. Each scan performs exactly `n - 1` comparisons
//! for a batch of `n` items and keeps the first run that reaches the maximum length.
//! The two scans are independent, so the rising and falling windows may overlap.
//!
//! Results never copy items: a [`Window`] is an offset and length into the batch
//! that was analyzed.

pub mod analyzer;
pub mod limiter;
mod properties;
pub mod scan;

pub use analyzer::{AnalysisError, AnalyzerStats, SequenceAnalyzer};
pub use limiter::{ConcurrencyLimiter, LimiterPermit};
pub use scan::{Direction, longest_run};

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::ops::Range;
use std::time::Duration;

/// Values the analyzer accepts.
///
/// Any cheap-to-copy, comparable value works; integers and floats both qualify.
pub trait Item: Copy + PartialOrd + Send + Sync + Debug + 'static {}

impl<T> Item for T where T: Copy + PartialOrd + Send + Sync + Debug + 'static {}

/// Contiguous sub-range of an analyzed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    /// Offset of the first element
    pub start: usize,
    /// Number of elements
    pub len: usize,
}

impl Window {
    /// The window of an empty batch.
    pub const EMPTY: Self = Self { start: 0, len: 0 };

    /// Create a window.
    #[must_use]
    pub const fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// Whether the window covers no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One past the last covered offset.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.start + self.len
    }

    /// Offsets covered by the window.
    #[must_use]
    pub const fn range(&self) -> Range<usize> {
        self.start..self.end()
    }

    /// Resolve the window against the batch it was computed from.
    ///
    /// Returns `None` if the window does not fit inside `batch`.
    #[must_use]
    pub fn slice<'a, T>(&self, batch: &'a [T]) -> Option<&'a [T]> {
        batch.get(self.range())
    }
}

/// Outcome of analyzing one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// First longest strictly increasing run
    pub longest_rising: Window,
    /// First longest strictly decreasing run
    pub longest_descending: Window,
    /// Comparisons performed by both scans together
    pub total_comparisons: u64,
    /// Wall-clock time spent scanning
    pub elapsed: Duration,
}

impl AnalysisResult {
    /// Result for an empty batch: empty windows, no comparisons, no time.
    pub const EMPTY: Self = Self {
        longest_rising: Window::EMPTY,
        longest_descending: Window::EMPTY,
        total_comparisons: 0,
        elapsed: Duration::ZERO,
    };

    /// Whether the window boundaries and comparison counts match, ignoring timing.
    #[must_use]
    pub fn same_outcome(&self, other: &Self) -> bool {
        self.longest_rising == other.longest_rising
            && self.longest_descending == other.longest_descending
            && self.total_comparisons == other.total_comparisons
    }
}
