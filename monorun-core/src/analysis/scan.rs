//! Single-pass longest-run scan.

use super::Window;

/// Direction a run must move in to continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Each element strictly greater than its predecessor
    Rising,
    /// Each element strictly less than its predecessor
    Falling,
}

impl Direction {
    #[inline]
    fn continues<T: PartialOrd>(self, previous: &T, current: &T) -> bool {
        match self {
            Self::Rising => current > previous,
            Self::Falling => current < previous,
        }
    }
}

/// Find the first longest run in `items` moving in `direction`.
///
/// Returns the run's window and the number of comparisons performed, which is
/// always `items.len().saturating_sub(1)`. A later run of equal length never
/// replaces an earlier one. Non-empty input always yields a window of length >= 1.
#[must_use]
pub fn longest_run<T: PartialOrd>(items: &[T], direction: Direction) -> (Window, u64) {
    if items.is_empty() {
        return (Window::EMPTY, 0);
    }

    let mut best = Window::new(0, 1);
    let mut current = Window::new(0, 1);
    let mut comparisons = 0u64;

    for (offset, pair) in items.windows(2).enumerate() {
        comparisons += 1;
        if direction.continues(&pair[0], &pair[1]) {
            current.len += 1;
        } else {
            if current.len > best.len {
                best = current;
            }
            current = Window::new(offset + 1, 1);
        }
    }

    if current.len > best.len {
        best = current;
    }

    (best, comparisons)
}
