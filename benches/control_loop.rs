// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Control loop benchmarks: quality metrics, drift detection, monitor overhead

use anyhow::Result;
use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

use proxima_sentinel::core::{DriftConfig, MonitoringConfig, QualityConfig, QualityMetrics};
use proxima_sentinel::{
    AdaptiveIndexManager, DriftDetector, IndexOptimizationStrategy, IndexOptimizer,
    PerformanceMonitor, QualityMetricsEngine, SentinelConfig, StrategyKind,
};

struct NoopOptimizer;

#[async_trait]
impl IndexOptimizer for NoopOptimizer {
    async fn full_reindex(&self, _strategy: &IndexOptimizationStrategy) -> Result<()> {
        Ok(())
    }

    async fn partial_reindex(&self, _strategy: &IndexOptimizationStrategy) -> Result<()> {
        Ok(())
    }

    async fn tune_parameters(&self, _strategy: &IndexOptimizationStrategy) -> Result<()> {
        Ok(())
    }

    async fn prune(&self, _strategy: &IndexOptimizationStrategy) -> Result<()> {
        Ok(())
    }

    async fn expand(&self, _strategy: &IndexOptimizationStrategy) -> Result<()> {
        Ok(())
    }
}

fn random_vectors(count: usize, dimension: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| (0..dimension).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect()
}

fn metrics_stream(count: usize, seed: u64) -> Vec<QualityMetrics> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| QualityMetrics {
            mean_magnitude: 1.0 + rng.gen_range(-0.05..0.05),
            std_magnitude: 0.1 + rng.gen_range(-0.01..0.01),
            mean_dimensionality_usage: 0.9 + rng.gen_range(-0.02..0.02),
            inter_vector_similarity: 0.1 + rng.gen_range(-0.02..0.02),
            distribution_entropy: 3.5 + rng.gen_range(-0.1..0.1),
            quality_score: 0.8 + rng.gen_range(-0.03..0.03),
            sample_size: 1000,
            timestamp_ns: i as u64,
        })
        .collect()
}

/// Quality metrics cost is bounded by the sample, not the collection
fn benchmark_quality_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("quality_metrics");
    group.measurement_time(Duration::from_secs(10));
    let engine = QualityMetricsEngine::new(QualityConfig::default());

    for collection_size in [1_000, 10_000, 100_000] {
        let vectors = random_vectors(collection_size, 128, 7);
        group.throughput(Throughput::Elements(1000));
        group.bench_with_input(
            BenchmarkId::new("compute_metrics", collection_size),
            &vectors,
            |b, vectors| b.iter(|| black_box(engine.compute_metrics(vectors, 1000))),
        );
    }
    group.finish();
}

fn benchmark_drift_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("drift_detection");
    let stream = metrics_stream(1_000, 11);

    group.bench_function("detect_drift_warm", |b| {
        let mut detector = DriftDetector::new(DriftConfig::default());
        for metrics in &stream[..100] {
            detector.detect_drift(metrics);
        }
        let mut cursor = 100;
        b.iter(|| {
            cursor = if cursor + 1 >= stream.len() { 100 } else { cursor + 1 };
            black_box(detector.detect_drift(&stream[cursor]))
        })
    });
    group.finish();
}

fn benchmark_monitor_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("performance_monitor");

    group.bench_function("start_and_complete", |b| {
        let mut monitor = PerformanceMonitor::new(MonitoringConfig {
            seed: Some(5),
            ..MonitoringConfig::default()
        });
        b.iter(|| {
            let handle = monitor.start_tracking("search");
            monitor.record_completion(black_box(handle), true);
        })
    });

    group.bench_function("record_operation", |b| {
        let mut monitor = PerformanceMonitor::new(MonitoringConfig {
            seed: Some(5),
            ..MonitoringConfig::default()
        });
        b.iter(|| black_box(monitor.record_operation("search", 250_000, true)))
    });
    group.finish();
}

fn benchmark_adaptation_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("adaptation_cycle");
    group.measurement_time(Duration::from_secs(10));
    let runtime = Runtime::new().unwrap();
    let vectors = random_vectors(10_000, 128, 13);

    group.bench_function("evaluate_and_execute", |b| {
        let mut config = SentinelConfig::default();
        config.adaptation.cooldown_ms = 0;
        let mut manager = AdaptiveIndexManager::new(config, Arc::new(NoopOptimizer));
        let fallback = IndexOptimizationStrategy::new(StrategyKind::ParameterTuning, 3, 0.1, 0.01);

        b.iter(|| {
            let strategies = manager.evaluate_adaptation_needs(&vectors);
            let strategy = strategies.first().unwrap_or(&fallback);
            black_box(runtime.block_on(manager.execute_strategy(strategy)))
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_quality_metrics,
    benchmark_drift_detection,
    benchmark_monitor_overhead,
    benchmark_adaptation_cycle
);
criterion_main!(benches);
