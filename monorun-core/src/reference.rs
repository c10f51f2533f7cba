//! Eager longest-rising-run finder over a fully materialized slice.
//!
//! Independent of the pipeline; property tests use it as an oracle.

/// Return the first longest strictly increasing contiguous run in `items`.
///
/// Empty input yields an empty slice; any non-empty input yields at least one
/// element.
#[must_use]
pub fn longest_rising_run<T: PartialOrd>(items: &[T]) -> &[T] {
    let mut best = 0..items.len().min(1);
    let mut start = 0;

    for end in 1..=items.len() {
        let run_ends = end == items.len() || !(items[end] > items[end - 1]);
        if run_ends {
            if end - start > best.len() {
                best = start..end;
            }
            start = end;
        }
    }

    &items[best]
}
