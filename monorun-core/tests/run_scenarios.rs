//! Fixed input scenarios for batch and streaming analysis.

#![allow(clippy::unwrap_used)]

use monorun_core::{
    AnalysisError, AnalysisResult, AnalyzerConfig, CancelToken, SequenceAnalyzer, Window,
};
use std::time::Duration;

fn analyzer<T: monorun_core::Item>(initial_stream_capacity: usize) -> SequenceAnalyzer<T> {
    SequenceAnalyzer::new(&AnalyzerConfig {
        max_concurrency: Some(2),
        initial_stream_capacity,
        ..AnalyzerConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn mixed_sequence_finds_first_longest_runs() {
    let items = [4, 3, 5, 8, 5, 0, 0, -3];
    let result = analyzer(16).analyze(&items, &CancelToken::new()).await.unwrap();

    assert_eq!(result.longest_rising, Window::new(1, 3));
    assert_eq!(result.longest_rising.slice(&items), Some(&[3, 5, 8][..]));
    // 8, 5, 0 is the first strictly falling run of length 3
    assert_eq!(result.longest_descending, Window::new(3, 3));
    assert_eq!(result.total_comparisons, 14);
}

#[tokio::test]
async fn empty_batch_yields_empty_result() {
    let result = analyzer::<i32>(16)
        .analyze(&[], &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(result, AnalysisResult::EMPTY);
    assert!(result.longest_rising.is_empty());
    assert!(result.longest_descending.is_empty());
    assert_eq!(result.total_comparisons, 0);
}

#[tokio::test]
async fn plateau_yields_single_element_windows() {
    let result = analyzer(16)
        .analyze(&[1, 1, 1, 1], &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(result.longest_rising, Window::new(0, 1));
    assert_eq!(result.longest_descending, Window::new(0, 1));
}

#[tokio::test]
async fn rising_and_falling_windows_may_overlap() {
    let result = analyzer(16)
        .analyze(&[1, 2, 3, 2, 1], &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(result.longest_rising, Window::new(0, 3));
    assert_eq!(result.longest_descending, Window::new(2, 3));
}

#[tokio::test]
async fn floats_with_nan_break_runs() {
    let result = analyzer(16)
        .analyze(&[1.0, 2.0, f64::NAN, 3.0, 4.0, 5.0], &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(result.longest_rising, Window::new(3, 3));
}

#[tokio::test]
async fn five_thousand_item_stream_matches_direct_analysis() {
    let items: Vec<i32> = (0..5000).map(|i| (i * 7919) % 1013).collect();
    let analyzer = analyzer(1024);
    let cancel = CancelToken::new();

    let streamed = analyzer
        .analyze_stream(tokio_stream::iter(items.clone()), &cancel)
        .await
        .unwrap();
    let direct = analyzer.analyze(&items, &cancel).await.unwrap();

    assert!(streamed.same_outcome(&direct));
    // 1024 -> 2048 -> 4096 -> 8192
    assert!(analyzer.stats().buffer_growths >= 2);
    assert_eq!(analyzer.pool().stats().outstanding(), 0);
}

#[tokio::test]
async fn cancelled_stream_surfaces_cancellation() {
    let analyzer = analyzer::<i32>(16);
    let cancel = CancelToken::new();
    let source = tokio_stream::StreamExt::chain(
        tokio_stream::iter(0..100),
        tokio_stream::pending(),
    );

    let trigger = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        })
    };

    assert_eq!(
        analyzer.analyze_stream(source, &cancel).await,
        Err(AnalysisError::Cancelled)
    );
    trigger.await.unwrap();
    assert_eq!(analyzer.stats().cancelled, 1);
}

#[tokio::test]
async fn disposed_analyzer_refuses_work() {
    let analyzer = analyzer::<i32>(16);
    analyzer.dispose();
    analyzer.dispose();

    assert_eq!(
        analyzer.analyze(&[1, 2], &CancelToken::new()).await,
        Err(AnalysisError::Disposed)
    );
    assert_eq!(
        analyzer.analyze(&[], &CancelToken::new()).await,
        Err(AnalysisError::Disposed)
    );
}
