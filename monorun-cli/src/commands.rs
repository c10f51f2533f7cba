//! Command implementations, separated from argument parsing for testing.

use anyhow::{Context, Result};
use monorun_core::{AnalysisResult, BatchAnalysis, CancelToken, PipelineConfig, SequenceProcessor};
use tokio_stream::StreamExt;
use tracing::{debug, info};

/// Push `values` through the queue and collect every batch report.
pub async fn run_pipeline(values: &[f64], config: &PipelineConfig) -> Result<Vec<BatchAnalysis>> {
    let processor =
        SequenceProcessor::new(config).context("failed to start the analysis pipeline")?;
    let results = processor.results()?;
    let consumer = tokio::spawn(results.collect::<Vec<_>>());

    let cancel = CancelToken::new();
    for &value in values {
        processor.try_add(value, &cancel).await?;
    }
    processor.complete_adding();
    debug!(items = values.len(), "all values queued");

    let reports = consumer.await.context("result consumer failed")?;
    let stats = processor.stats();
    processor.dispose().await;

    info!(
        batches = reports.len(),
        analyses = stats.analyzer.analyses,
        comparisons = stats.analyzer.total_comparisons,
        peak_in_flight = stats.analyzer.peak_in_flight,
        "pipeline finished"
    );
    Ok(reports)
}

/// Analyze `values` as one streamed sequence.
pub async fn run_stream(values: &[f64], config: &PipelineConfig) -> Result<AnalysisResult> {
    let processor =
        SequenceProcessor::new(config).context("failed to start the analysis pipeline")?;
    let source = tokio_stream::iter(values.iter().copied());

    let outcome = processor.analyze_stream(source, &CancelToken::new()).await;
    let stats = processor.stats();
    processor.dispose().await;

    let result = outcome?;
    info!(
        items = values.len(),
        buffer_growths = stats.analyzer.buffer_growths,
        comparisons = result.total_comparisons,
        "stream analyzed"
    );
    Ok(result)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use monorun_core::Window;

    fn small_batches() -> PipelineConfig {
        PipelineConfig {
            queue_capacity: 4,
            batch_size: 3,
            ..PipelineConfig::default()
        }
    }

    #[tokio::test]
    async fn test_pipeline_covers_every_value() {
        let values: Vec<f64> = (0..50).map(f64::from).collect();
        let reports = run_pipeline(&values, &small_batches()).await.unwrap();

        assert_eq!(reports.iter().map(|r| r.batch_len).sum::<usize>(), 50);
        assert!(reports.iter().all(|r| r.batch_len <= 3));
    }

    #[tokio::test]
    async fn test_stream_scenario() {
        let values = [4.0, 3.0, 5.0, 8.0, 5.0, 0.0, 0.0, -3.0];
        let result = run_stream(&values, &PipelineConfig::default()).await.unwrap();

        assert_eq!(result.longest_rising, Window::new(1, 3));
        assert_eq!(result.longest_descending, Window::new(3, 3));
    }

    #[tokio::test]
    async fn test_invalid_config_is_reported() {
        let config = PipelineConfig {
            batch_size: 0,
            ..PipelineConfig::default()
        };
        let err = run_pipeline(&[1.0], &config).await.unwrap_err();
        assert!(format!("{err:#}").contains("batch_size"));
    }

    #[tokio::test]
    async fn test_oversized_concurrency_is_reported() {
        let mut config = PipelineConfig::default();
        config.analyzer.max_concurrency = Some(usize::MAX);

        let err = run_stream(&[1.0], &config).await.unwrap_err();
        assert!(format!("{err:#}").contains("max_concurrency must be at most"));
    }
}
