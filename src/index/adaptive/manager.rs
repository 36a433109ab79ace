// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Adaptive Index Manager - the quality, drift and performance control loop

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::strategy::STRATEGY_OPERATION_PREFIX;
use super::{AdaptationHistory, IndexOptimizationStrategy, IndexOptimizer, StrategyKind};
use crate::core::{Clock, QualityMetrics, SentinelConfig, SystemClock, VectorSource};
use crate::drift::{DriftAlert, DriftDetector, DriftType};
use crate::monitoring::PerformanceMonitor;
use crate::quality::QualityMetricsEngine;

/// Tolerance for the cumulative budget comparison
const BUDGET_EPSILON: f64 = 1e-9;

const FULL_REINDEX_COST: f64 = 0.08;
const PARTIAL_REINDEX_COST: f64 = 0.04;
const PRUNING_COST: f64 = 0.03;
const EXPANSION_COST: f64 = 0.05;
const SPARSITY_TUNING_COST: f64 = 0.01;
const DRIFT_TUNING_COST: f64 = 0.02;
const REGRESSION_TUNING_COST: f64 = 0.02;
const OVERHEAD_TUNING_COST: f64 = 0.005;

/// Operation type of the manager's own quality-metrics computation
pub const QUALITY_METRICS_OPERATION: &str = "quality_metrics";

/// Operation type of the manager's own drift-detection cycle
pub const DRIFT_DETECTION_OPERATION: &str = "drift_detection";

/// Whether `operation_type` is timed by the manager itself rather than the host
///
/// Internal timings count toward monitoring overhead but never toward index
/// latency regressions.
pub fn is_internal_operation(operation_type: &str) -> bool {
    operation_type == QUALITY_METRICS_OPERATION
        || operation_type == DRIFT_DETECTION_OPERATION
        || operation_type.starts_with(STRATEGY_OPERATION_PREFIX)
}

/// Manager shared across tasks
pub type SharedAdaptiveIndexManager = Arc<Mutex<AdaptiveIndexManager>>;

/// Control loop for one monitored collection
pub struct AdaptiveIndexManager {
    config: SentinelConfig,
    clock: Arc<dyn Clock>,
    quality_engine: QualityMetricsEngine,
    drift_detector: DriftDetector,
    monitor: PerformanceMonitor,
    optimizer: Arc<dyn IndexOptimizer>,
    history: AdaptationHistory,
    last_metrics: Option<QualityMetrics>,
    /// Collection size at the last index rebuild or expansion
    capacity_baseline: Option<usize>,
    last_collection_len: usize,
}

impl std::fmt::Debug for AdaptiveIndexManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptiveIndexManager")
            .field("config", &self.config.adaptation)
            .field("history_len", &self.history.len())
            .field("capacity_baseline", &self.capacity_baseline)
            .finish()
    }
}

impl AdaptiveIndexManager {
    pub fn new(config: SentinelConfig, optimizer: Arc<dyn IndexOptimizer>) -> Self {
        Self::with_clock(config, optimizer, Arc::new(SystemClock::new()))
    }

    /// Manager whose quality timestamps, monitor and cooldown share `clock`
    pub fn with_clock(
        config: SentinelConfig,
        optimizer: Arc<dyn IndexOptimizer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let adaptation = &config.adaptation;
        Self {
            quality_engine: QualityMetricsEngine::with_clock(config.quality.clone(), clock.clone()),
            drift_detector: DriftDetector::new(config.drift.clone()),
            monitor: PerformanceMonitor::with_clock(config.monitoring.clone(), clock.clone()),
            history: AdaptationHistory::new(adaptation.history_capacity, adaptation.history_retain),
            optimizer,
            clock,
            last_metrics: None,
            capacity_baseline: None,
            last_collection_len: 0,
            config,
        }
    }

    pub fn into_shared(self) -> SharedAdaptiveIndexManager {
        Arc::new(Mutex::new(self))
    }

    /// Evaluate `vectors` and return the admitted strategies in priority order
    ///
    /// Returns an empty list while the cooldown is active.
    pub fn evaluate_adaptation_needs(
        &mut self,
        vectors: &dyn VectorSource,
    ) -> Vec<IndexOptimizationStrategy> {
        if self.cooldown_active() {
            return Vec::new();
        }

        let sample_size = self.config.adaptation.evaluation_sample_size;
        let engine = &self.quality_engine;
        let metrics = self
            .monitor
            .track(QUALITY_METRICS_OPERATION, || engine.compute_metrics(vectors, sample_size));

        self.select_strategies(metrics, vectors.len())
    }

    /// Same as [`evaluate_adaptation_needs`](Self::evaluate_adaptation_needs)
    /// for hosts that computed the metrics themselves
    pub fn evaluate_with_metrics(
        &mut self,
        metrics: QualityMetrics,
        collection_len: usize,
    ) -> Vec<IndexOptimizationStrategy> {
        if self.cooldown_active() {
            return Vec::new();
        }
        self.select_strategies(metrics, collection_len)
    }

    fn cooldown_active(&self) -> bool {
        let remaining = self.cooldown_remaining();
        if remaining.is_zero() {
            return false;
        }
        debug!(
            "Skipping adaptation evaluation: cooldown active for another {:?}",
            remaining
        );
        true
    }

    fn select_strategies(
        &mut self,
        metrics: QualityMetrics,
        collection_len: usize,
    ) -> Vec<IndexOptimizationStrategy> {
        let mut candidates = Vec::new();

        // An empty sample says nothing about quality or drift
        if metrics.sample_size > 0 {
            let detector = &mut self.drift_detector;
            let alert = self
                .monitor
                .track(DRIFT_DETECTION_OPERATION, || detector.detect_drift(&metrics));

            candidates.extend(self.quality_candidates(&metrics));
            candidates.extend(self.drift_candidates(alert.as_ref()));
        }
        candidates.extend(self.performance_candidates());
        candidates.extend(self.capacity_candidates(collection_len));
        self.last_metrics = Some(metrics);
        self.last_collection_len = collection_len;

        for candidate in &mut candidates {
            if let Some(rate) = self.history.success_rate(candidate.kind) {
                candidate.estimated_impact *= 0.5 + 0.5 * rate;
            }
        }

        // stable: generation order is kept within a priority tier
        candidates.sort_by_key(|c| c.priority);

        let budget = self.config.adaptation.resource_budget;
        let mut spent = 0.0;
        let mut admitted = Vec::new();
        for candidate in candidates {
            if spent + candidate.resource_cost <= budget + BUDGET_EPSILON {
                spent += candidate.resource_cost;
                admitted.push(candidate);
            } else {
                debug!(
                    "Strategy {} (cost {:.3}) exceeds remaining budget {:.3}",
                    candidate.kind,
                    candidate.resource_cost,
                    budget - spent
                );
            }
        }

        if !admitted.is_empty() {
            info!(
                "Selected {} adaptation strategies ({}), budget used {:.3}/{:.3}",
                admitted.len(),
                admitted
                    .iter()
                    .map(|s| s.kind.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                spent,
                budget
            );
        }
        admitted
    }

    fn quality_candidates(&self, metrics: &QualityMetrics) -> Vec<IndexOptimizationStrategy> {
        let rules = &self.config.adaptation;
        let mut candidates = Vec::new();

        if metrics.quality_score < rules.rebuild_threshold {
            candidates.push(
                IndexOptimizationStrategy::new(
                    StrategyKind::FullReindex,
                    1,
                    1.0 - metrics.quality_score,
                    FULL_REINDEX_COST,
                )
                .with_description(format!(
                    "Quality score {:.3} below rebuild threshold {:.2}",
                    metrics.quality_score, rules.rebuild_threshold
                ))
                .with_parameter("quality_score", metrics.quality_score),
            );
        }

        if metrics.mean_dimensionality_usage < rules.sparsity_threshold {
            candidates.push(
                IndexOptimizationStrategy::new(
                    StrategyKind::ParameterTuning,
                    2,
                    (1.0 - metrics.mean_dimensionality_usage) * 0.5,
                    SPARSITY_TUNING_COST,
                )
                .with_description(format!(
                    "Sparse vectors use {:.1}% of dimensions",
                    metrics.mean_dimensionality_usage * 100.0
                ))
                .with_parameter("dimensionality_usage", metrics.mean_dimensionality_usage),
            );
        }

        if metrics.inter_vector_similarity > rules.similarity_threshold {
            let headroom = (1.0 - rules.similarity_threshold).max(f64::EPSILON);
            candidates.push(
                IndexOptimizationStrategy::new(
                    StrategyKind::Pruning,
                    2,
                    0.6 * ((metrics.inter_vector_similarity - rules.similarity_threshold) / headroom)
                        .min(1.0),
                    PRUNING_COST,
                )
                .with_description(format!(
                    "Inter-vector similarity {:.3} suggests redundant vectors",
                    metrics.inter_vector_similarity
                ))
                .with_parameter("similarity", metrics.inter_vector_similarity),
            );
        }

        candidates
    }

    fn drift_candidates(&self, alert: Option<&DriftAlert>) -> Vec<IndexOptimizationStrategy> {
        let Some(alert) = alert else {
            return Vec::new();
        };

        match alert.drift_type {
            DriftType::Sudden if alert.confidence > self.config.adaptation.sudden_drift_confidence => {
                vec![IndexOptimizationStrategy::new(
                    StrategyKind::PartialReindex,
                    1,
                    alert.confidence * 0.6,
                    PARTIAL_REINDEX_COST,
                )
                .with_description(format!(
                    "Sudden drift ({:?}) with confidence {:.2}",
                    alert.severity, alert.confidence
                ))
                .with_parameter("drift_confidence", alert.confidence)]
            }
            DriftType::Gradual => vec![IndexOptimizationStrategy::new(
                StrategyKind::ParameterTuning,
                2,
                alert.confidence * 0.4,
                DRIFT_TUNING_COST,
            )
            .with_description(format!(
                "Gradual drift with confidence {:.2}",
                alert.confidence
            ))
            .with_parameter("drift_confidence", alert.confidence)],
            _ => Vec::new(),
        }
    }

    fn performance_candidates(&self) -> Vec<IndexOptimizationStrategy> {
        let mut candidates = Vec::new();

        let mut regressed = self.monitor.regressed_operations();
        regressed.retain(|op| !is_internal_operation(op));
        if !regressed.is_empty() {
            candidates.push(
                IndexOptimizationStrategy::new(
                    StrategyKind::ParameterTuning,
                    2,
                    0.3,
                    REGRESSION_TUNING_COST,
                )
                .with_description(format!("Latency regression in {}", regressed.join(", ")))
                .with_parameter("regressed_operations", regressed.len() as f64),
            );
        }

        if !self.monitor.is_overhead_acceptable() {
            candidates.push(
                IndexOptimizationStrategy::new(
                    StrategyKind::ParameterTuning,
                    3,
                    0.1,
                    OVERHEAD_TUNING_COST,
                )
                .with_description(format!(
                    "Monitoring overhead {:.3}% above target {:.3}%",
                    self.monitor.overhead_percentage(),
                    self.config.monitoring.target_overhead_percent
                ))
                .with_parameter("overhead_percentage", self.monitor.overhead_percentage())
                .with_parameter("sampling_rate", self.monitor.sampling_rate()),
            );
        }

        candidates
    }

    fn capacity_candidates(&mut self, collection_len: usize) -> Vec<IndexOptimizationStrategy> {
        let baseline = *self.capacity_baseline.get_or_insert(collection_len);
        if baseline == 0 {
            self.capacity_baseline = Some(collection_len);
            return Vec::new();
        }

        let growth = collection_len as f64 / baseline as f64;
        if growth < self.config.adaptation.expansion_growth_ratio {
            return Vec::new();
        }

        vec![IndexOptimizationStrategy::new(
            StrategyKind::Expansion,
            3,
            0.3,
            EXPANSION_COST,
        )
        .with_description(format!(
            "Collection grew {:.1}x since the last rebuild ({} -> {} vectors)",
            growth, baseline, collection_len
        ))
        .with_parameter("growth_ratio", growth)
        .with_parameter("collection_len", collection_len as f64)]
    }

    /// Run `strategy` through the index optimizer and record the outcome
    ///
    /// Always restarts the cooldown, whether or not the handler succeeded.
    pub async fn execute_strategy(&mut self, strategy: &IndexOptimizationStrategy) -> bool {
        let operation_type = strategy.kind.operation_type();
        let before = self.optimizer.performance_score().await;

        let handle = self.monitor.start_tracking(&operation_type);
        let outcome = match strategy.kind {
            StrategyKind::FullReindex => self.optimizer.full_reindex(strategy).await,
            StrategyKind::PartialReindex => self.optimizer.partial_reindex(strategy).await,
            StrategyKind::ParameterTuning => self.optimizer.tune_parameters(strategy).await,
            StrategyKind::Pruning => self.optimizer.prune(strategy).await,
            StrategyKind::Expansion => self.optimizer.expand(strategy).await,
        };
        let success = outcome.is_ok();
        self.monitor.record_completion(handle, success);

        let delta = match outcome {
            Ok(()) => {
                let after = self.optimizer.performance_score().await;
                info!(
                    "Executed {} strategy: performance {:.4} -> {:.4}",
                    strategy.kind, before, after
                );
                after - before
            }
            Err(e) => {
                warn!("Strategy {} failed: {:#}", strategy.kind, e);
                0.0
            }
        };

        if success && strategy.kind.rebuilds_index() {
            let len = strategy
                .parameter("collection_len")
                .map(|len| len as usize)
                .unwrap_or(self.last_collection_len);
            self.capacity_baseline = Some(len);
        }

        let now = self.clock.now_nanos();
        self.history.record(strategy.clone(), now, success, delta);
        success
    }

    pub fn cooldown_remaining(&self) -> Duration {
        self.history
            .cooldown_remaining(self.clock.now_nanos(), self.config.adaptation.cooldown())
    }

    pub fn quality_recommendations(&self, metrics: &QualityMetrics) -> Vec<String> {
        self.quality_engine.quality_recommendations(metrics)
    }

    pub fn performance_summary(&self) -> BTreeMap<String, f64> {
        self.monitor.performance_summary()
    }

    pub fn detection_statistics(&self) -> BTreeMap<String, f64> {
        self.drift_detector.detection_statistics()
    }

    pub fn recent_alerts(&self, limit: usize) -> Vec<DriftAlert> {
        self.drift_detector.recent_alerts(limit)
    }

    pub fn history(&self) -> &AdaptationHistory {
        &self.history
    }

    /// Metrics from the most recent evaluation
    pub fn last_metrics(&self) -> Option<&QualityMetrics> {
        self.last_metrics.as_ref()
    }

    pub fn config(&self) -> &SentinelConfig {
        &self.config
    }

    pub fn monitor(&self) -> &PerformanceMonitor {
        &self.monitor
    }

    /// Route host operation timings through the manager's monitor
    pub fn monitor_mut(&mut self) -> &mut PerformanceMonitor {
        &mut self.monitor
    }

    pub fn drift_detector(&self) -> &DriftDetector {
        &self.drift_detector
    }
}
