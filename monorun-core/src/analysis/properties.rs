//! Property-based tests for the run scans.
