//! Text and JSON rendering of analysis results.

use std::fmt::Write as _;

use anyhow::Result;
use monorun_core::{AnalysisResult, BatchAnalysis, Window};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

impl Format {
    #[must_use]
    pub const fn from_json_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Text }
    }
}

/// One line per batch, windows mapped to stream positions.
pub fn render_batch(report: &BatchAnalysis, format: Format) -> Result<String> {
    if format == Format::Json {
        return Ok(serde_json::to_string(report)?);
    }

    let rising = report.absolute(report.result.longest_rising);
    let descending = report.absolute(report.result.longest_descending);
    Ok(format!(
        "batch {:>4}  offset {:>8}  len {:>5}  rising {:?} ({})  descending {:?} ({})  comparisons {}  elapsed {:?}",
        report.batch_index,
        report.stream_offset,
        report.batch_len,
        rising,
        report.result.longest_rising.len,
        descending,
        report.result.longest_descending.len,
        report.result.total_comparisons,
        report.result.elapsed,
    ))
}

/// Multi-line summary of a whole-input analysis, including the run values.
pub fn render_result(result: &AnalysisResult, values: &[f64], format: Format) -> Result<String> {
    if format == Format::Json {
        return Ok(serde_json::to_string_pretty(result)?);
    }

    let mut out = String::new();
    writeln!(out, "items:       {}", values.len())?;
    writeln!(out, "rising:      {}", describe(result.longest_rising, values))?;
    writeln!(out, "descending:  {}", describe(result.longest_descending, values))?;
    writeln!(out, "comparisons: {}", result.total_comparisons)?;
    write!(out, "elapsed:     {:?}", result.elapsed)?;
    Ok(out)
}

fn describe(window: Window, values: &[f64]) -> String {
    if window.is_empty() {
        return "(none)".to_string();
    }
    let run = window
        .slice(values)
        .map(|run| {
            run.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();
    format!("{:?} len {} [{run}]", window.range(), window.len)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sample() -> AnalysisResult {
        AnalysisResult {
            longest_rising: Window::new(1, 3),
            longest_descending: Window::new(3, 3),
            total_comparisons: 14,
            elapsed: Duration::from_micros(3),
        }
    }

    #[test]
    fn test_batch_text_uses_absolute_positions() {
        let report = BatchAnalysis {
            batch_index: 1,
            stream_offset: 100,
            batch_len: 8,
            result: sample(),
        };
        let line = render_batch(&report, Format::Text).unwrap();

        assert!(line.contains("rising 101..104 (3)"));
        assert!(line.contains("descending 103..106 (3)"));
    }

    #[test]
    fn test_batch_json_round_trips() {
        let report = BatchAnalysis {
            batch_index: 0,
            stream_offset: 0,
            batch_len: 8,
            result: sample(),
        };
        let line = render_batch(&report, Format::Json).unwrap();
        let parsed: BatchAnalysis = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn test_result_text_lists_run_values() {
        let values = [4.0, 3.0, 5.0, 8.0, 5.0, 0.0, 0.0, -3.0];
        let text = render_result(&sample(), &values, Format::Text).unwrap();

        assert!(text.contains("rising:      1..4 len 3 [3, 5, 8]"));
        assert!(text.contains("descending:  3..6 len 3 [8, 5, 0]"));
    }

    #[test]
    fn test_empty_result_text() {
        let text = render_result(&AnalysisResult::EMPTY, &[], Format::Text).unwrap();
        assert!(text.contains("rising:      (none)"));
    }
}
