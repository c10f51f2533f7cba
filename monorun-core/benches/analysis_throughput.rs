//! Analysis and pipeline throughput benchmarks
//!
//! - Direct batch analysis over random and sorted inputs
//! - Streaming analysis including buffer growth
//! - End-to-end pipeline: add, batch, analyze, drain results

#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use monorun_core::{AnalyzerConfig, CancelToken, PipelineConfig, SequenceAnalyzer, SequenceProcessor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_stream::StreamExt;

fn random_values(len: usize) -> Vec<i64> {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    (0..len).map(|_| rng.gen_range(-1000..1000)).collect()
}

fn bench_analyze(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let analyzer = SequenceAnalyzer::<i64>::new(&AnalyzerConfig::default()).unwrap();
    let cancel = CancelToken::new();

    let mut group = c.benchmark_group("analyze");
    for len in [1_024usize, 16_384, 262_144] {
        let random = random_values(len);
        let sorted: Vec<i64> = (0..len as i64).collect();
        group.throughput(Throughput::Elements(len as u64));

        group.bench_with_input(BenchmarkId::new("random", len), &random, |b, items| {
            b.iter(|| rt.block_on(analyzer.analyze(black_box(items), &cancel)).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("sorted", len), &sorted, |b, items| {
            b.iter(|| rt.block_on(analyzer.analyze(black_box(items), &cancel)).unwrap());
        });
    }
    group.finish();
}

fn bench_analyze_stream(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let analyzer = SequenceAnalyzer::<i64>::new(&AnalyzerConfig {
        initial_stream_capacity: 1024,
        ..AnalyzerConfig::default()
    })
    .unwrap();
    let cancel = CancelToken::new();

    let mut group = c.benchmark_group("analyze_stream");
    for len in [4_096usize, 65_536] {
        let values = random_values(len);
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &values, |b, values| {
            b.iter(|| {
                let source = tokio_stream::iter(values.iter().copied());
                rt.block_on(analyzer.analyze_stream(source, &cancel)).unwrap()
            });
        });
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let values = random_values(50_000);

    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Elements(values.len() as u64));
    for batch_size in [64usize, 1024] {
        group.bench_with_input(
            BenchmarkId::new("batch_size", batch_size),
            &batch_size,
            |b, &batch_size| {
                b.iter(|| {
                    rt.block_on(async {
                        let processor = SequenceProcessor::new(&PipelineConfig {
                            batch_size,
                            ..PipelineConfig::default()
                        })
                        .unwrap();
                        let results = processor.results().unwrap();
                        let drain = tokio::spawn(results.fold(0usize, |n, _| n + 1));
                        let cancel = CancelToken::new();
                        for &value in &values {
                            processor.add(value, &cancel).await;
                        }
                        processor.complete_adding();
                        let batches = drain.await.unwrap();
                        processor.dispose().await;
                        black_box(batches)
                    })
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_analyze, bench_analyze_stream, bench_pipeline);
criterion_main!(benches);
