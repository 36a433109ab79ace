// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Performance Monitor - sampled operation tracking with bounded overhead

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tracing::debug;

use super::sampling::AdaptiveSampling;
use crate::core::{Clock, MonitoringConfig, SystemClock};

/// Monitor shared across threads by hosts that need it
pub type SharedPerformanceMonitor = Arc<Mutex<PerformanceMonitor>>;

/// Handle returned by [`PerformanceMonitor::start_tracking`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingHandle {
    /// Not sampled; completing it records nothing
    Untracked,
    Tracked {
        operation_type: String,
        started_at_ns: u64,
    },
}

impl TrackingHandle {
    pub fn is_tracked(&self) -> bool {
        matches!(self, TrackingHandle::Tracked { .. })
    }
}

/// One sampled operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub operation_latency_ns: u64,
    pub memory_usage_bytes: u64,
    pub cpu_utilization: f64,
    /// Expected monitoring overhead at the time of the sample, in percent
    pub overhead_percentage: f64,
    pub throughput_ops_per_sec: f64,
    pub timestamp_ns: u64,
    pub operation_type: String,
    pub success: bool,
}

/// Latency tracking state for one operation type
#[derive(Debug, Clone, Default)]
struct OperationStats {
    count: u64,
    recent_latencies: VecDeque<f64>,
    /// Smoothed latency of samples that aged out of the recent window
    baseline: Option<f64>,
}

/// Per-collection performance monitor
pub struct PerformanceMonitor {
    config: MonitoringConfig,
    clock: Arc<dyn Clock>,
    sampling: AdaptiveSampling,
    metrics: VecDeque<PerformanceMetrics>,
    operations: BTreeMap<String, OperationStats>,
    overhead_ema: Option<f64>,
    tracked_operations: u64,
    skipped_operations: u64,
}

impl std::fmt::Debug for PerformanceMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerformanceMonitor")
            .field("config", &self.config)
            .field("sampling_rate", &self.sampling.current_rate)
            .field("buffered_metrics", &self.metrics.len())
            .finish()
    }
}

impl PerformanceMonitor {
    pub fn new(config: MonitoringConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(config: MonitoringConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            sampling: AdaptiveSampling::new(&config),
            metrics: VecDeque::with_capacity(config.metrics_capacity),
            operations: BTreeMap::new(),
            overhead_ema: None,
            tracked_operations: 0,
            skipped_operations: 0,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &MonitoringConfig {
        &self.config
    }

    pub fn into_shared(self) -> SharedPerformanceMonitor {
        Arc::new(Mutex::new(self))
    }

    /// Begin timing an operation if the sampler selects it
    pub fn start_tracking(&mut self, operation_type: &str) -> TrackingHandle {
        if !self.sampling.should_sample() {
            self.skipped_operations += 1;
            return TrackingHandle::Untracked;
        }
        TrackingHandle::Tracked {
            operation_type: operation_type.to_string(),
            started_at_ns: self.clock.now_nanos(),
        }
    }

    pub fn record_completion(&mut self, handle: TrackingHandle, success: bool) {
        self.record_completion_with_usage(handle, success, 0, 0.0);
    }

    /// Complete a tracked operation with host-supplied resource figures
    pub fn record_completion_with_usage(
        &mut self,
        handle: TrackingHandle,
        success: bool,
        memory_usage_bytes: u64,
        cpu_utilization: f64,
    ) {
        let TrackingHandle::Tracked {
            operation_type,
            started_at_ns,
        } = handle
        else {
            return;
        };

        let latency_ns = self.clock.now_nanos().saturating_sub(started_at_ns);
        self.record_sample(
            operation_type,
            latency_ns,
            success,
            memory_usage_bytes,
            cpu_utilization,
        );
    }

    /// Record an operation the host timed itself
    ///
    /// Passes through the same sampling gate as [`start_tracking`](Self::start_tracking);
    /// returns whether the operation was recorded.
    pub fn record_operation(&mut self, operation_type: &str, latency_ns: u64, success: bool) -> bool {
        if !self.sampling.should_sample() {
            self.skipped_operations += 1;
            return false;
        }
        self.record_sample(operation_type.to_string(), latency_ns, success, 0, 0.0);
        true
    }

    /// Time `operation` under `operation_type`
    pub fn track<T>(&mut self, operation_type: &str, operation: impl FnOnce() -> T) -> T {
        let handle = self.start_tracking(operation_type);
        let result = operation();
        self.record_completion(handle, true);
        result
    }

    fn record_sample(
        &mut self,
        operation_type: String,
        latency_ns: u64,
        success: bool,
        memory_usage_bytes: u64,
        cpu_utilization: f64,
    ) {
        let latency_ns = latency_ns.max(1);
        let latency = latency_ns as f64;

        // Overhead of this sample, scaled by the share of operations being tracked
        let per_operation = self.config.monitoring_cost_ns as f64 / latency * 100.0;
        let expected = per_operation * self.sampling.current_rate;
        let smoothing = self.config.overhead_smoothing;
        let overhead = match self.overhead_ema {
            Some(previous) => previous * (1.0 - smoothing) + expected * smoothing,
            None => expected,
        };
        self.overhead_ema = Some(overhead);
        self.sampling.update(overhead);

        let stats = self.operations.entry(operation_type.clone()).or_default();
        stats.count += 1;
        stats.recent_latencies.push_back(latency);
        while stats.recent_latencies.len() > self.config.regression_window.max(1) {
            if let Some(aged) = stats.recent_latencies.pop_front() {
                let weight = self.config.baseline_smoothing;
                stats.baseline = Some(match stats.baseline {
                    Some(baseline) => baseline * (1.0 - weight) + aged * weight,
                    None => aged,
                });
            }
        }

        if self.metrics.len() >= self.config.metrics_capacity.max(1) {
            self.metrics.pop_front();
        }
        self.metrics.push_back(PerformanceMetrics {
            operation_latency_ns: latency_ns,
            memory_usage_bytes,
            cpu_utilization,
            overhead_percentage: overhead,
            throughput_ops_per_sec: 1e9 / latency,
            timestamp_ns: self.clock.now_nanos(),
            operation_type,
            success,
        });
        self.tracked_operations += 1;
    }

    /// Whether recent latencies of `operation_type` exceed the baseline by
    /// more than `threshold` (relative)
    pub fn detect_regression(&self, operation_type: &str, threshold: f64) -> bool {
        let Some(stats) = self.operations.get(operation_type) else {
            return false;
        };
        let Some(baseline) = stats.baseline else {
            return false;
        };
        if stats.recent_latencies.is_empty() || baseline <= 0.0 {
            return false;
        }

        let recent = stats.recent_latencies.iter().sum::<f64>() / stats.recent_latencies.len() as f64;
        let regressed = (recent - baseline) / baseline > threshold;
        if regressed {
            debug!(
                "Latency regression on {}: recent {:.0}ns vs baseline {:.0}ns",
                operation_type, recent, baseline
            );
        }
        regressed
    }

    /// Operation types currently regressed at the configured threshold
    pub fn regressed_operations(&self) -> Vec<String> {
        self.operations
            .keys()
            .filter(|op| self.detect_regression(op, self.config.regression_threshold))
            .cloned()
            .collect()
    }

    pub fn is_overhead_acceptable(&self) -> bool {
        self.overhead_percentage() <= self.config.target_overhead_percent
    }

    /// Smoothed expected overhead in percent; 0 before the first sample
    pub fn overhead_percentage(&self) -> f64 {
        self.overhead_ema.unwrap_or(0.0)
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling.current_rate()
    }

    pub fn sampling(&self) -> &AdaptiveSampling {
        &self.sampling
    }

    /// Most recent samples, newest first
    pub fn recent_metrics(&self, limit: usize) -> Vec<PerformanceMetrics> {
        self.metrics.iter().rev().take(limit).cloned().collect()
    }

    /// Recorded sample count per operation type
    pub fn operation_types(&self) -> BTreeMap<String, u64> {
        self.operations
            .iter()
            .map(|(op, stats)| (op.clone(), stats.count))
            .collect()
    }

    pub fn baseline_latency(&self, operation_type: &str) -> Option<f64> {
        self.operations.get(operation_type).and_then(|stats| stats.baseline)
    }

    pub fn performance_summary(&self) -> BTreeMap<String, f64> {
        let mut summary = BTreeMap::new();
        let buffered = self.metrics.len();
        let (avg_latency, success_rate, avg_throughput) = if buffered == 0 {
            (0.0, 0.0, 0.0)
        } else {
            let n = buffered as f64;
            let latency = self.metrics.iter().map(|m| m.operation_latency_ns as f64).sum::<f64>() / n;
            let successes = self.metrics.iter().filter(|m| m.success).count() as f64 / n;
            let throughput = self.metrics.iter().map(|m| m.throughput_ops_per_sec).sum::<f64>() / n;
            (latency, successes, throughput)
        };

        summary.insert("sampling_rate".to_string(), self.sampling.current_rate());
        summary.insert("overhead_percentage".to_string(), self.overhead_percentage());
        summary.insert(
            "target_overhead_percentage".to_string(),
            self.config.target_overhead_percent,
        );
        summary.insert("tracked_operations".to_string(), self.tracked_operations as f64);
        summary.insert("skipped_operations".to_string(), self.skipped_operations as f64);
        summary.insert("buffered_metrics".to_string(), buffered as f64);
        summary.insert("operation_types".to_string(), self.operations.len() as f64);
        summary.insert("avg_latency_ns".to_string(), avg_latency);
        summary.insert("success_rate".to_string(), success_rate);
        summary.insert("avg_throughput_ops_per_sec".to_string(), avg_throughput);
        summary
    }
}
