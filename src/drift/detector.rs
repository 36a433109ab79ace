// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Drift detection over a rolling quality-metrics history

use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, warn};
use uuid::Uuid;

use super::statistics::{
    euclidean, floored_z_score, linear_fit, mean, median, mid_rank_tail, scaled_confidence,
    std_dev, z_score, SPREAD_EPSILON,
};
use super::{AdaptiveThreshold, DetectionFamily, DriftAlert, DriftSeverity, DriftType};
use crate::core::{DriftConfig, QualityMetrics};

/// History required before the pattern family runs
const PATTERN_MIN_HISTORY: usize = 20;

/// History required before the trend family runs
const TREND_MIN_HISTORY: usize = 15;

/// Two-sided tail fraction at which the KS-style test starts to report
const KS_TAIL_CUTOFF: f64 = 0.05;

/// t statistic at which the recent-mean comparison starts to report
const T_TEST_OFFSET: f64 = 4.0;

/// Neighbour-distance ratio at which the local outlier score starts to report
const LOCAL_OUTLIER_OFFSET: f64 = 3.0;

/// Standardised extrapolation error at which the temporal test starts to report
const TEMPORAL_OFFSET: f64 = 3.0;

/// Standardised half-window shift at which the change-point test starts to report
const CHANGE_POINT_OFFSET: f64 = 3.0;

/// Recent-to-overall spread ratio at which the volatility test starts to report
const VOLATILITY_OFFSET: f64 = 1.5;

/// Coefficient of determination below which a linear fit carries no weight
const MIN_TREND_FIT: f64 = 0.3;

/// Metrics covered by the multi-metric Z-test
const Z_TEST_METRICS: usize = 5;

/// Recent scores used for the temporal prediction
const PREDICTION_WINDOW: usize = 5;

/// Hard cap on trend-family samples
const MAX_TREND_WINDOW: usize = 20;

/// Per-family confidences of one detection cycle
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FamilyConfidences {
    pub statistical: f64,
    pub pattern: f64,
    pub trend: f64,
    /// Linear-trend strength, used to classify gradual drift
    pub linear_trend: f64,
    /// Volatility-change confidence, used to classify sudden drift
    pub volatility: f64,
}

impl FamilyConfidences {
    /// Family confidences in evaluation order
    pub fn ordered(&self) -> [(DetectionFamily, f64); 3] {
        [
            (DetectionFamily::Statistical, self.statistical),
            (DetectionFamily::Pattern, self.pattern),
            (DetectionFamily::Trend, self.trend),
        ]
    }

    pub fn max(&self) -> f64 {
        self.statistical.max(self.pattern).max(self.trend)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct TrendSignals {
    linear: f64,
    change_point: f64,
    volatility: f64,
}

impl TrendSignals {
    fn confidence(&self) -> f64 {
        self.linear.max(self.change_point).max(self.volatility)
    }
}

/// Per-collection drift detector
#[derive(Debug)]
pub struct DriftDetector {
    config: DriftConfig,
    history: VecDeque<QualityMetrics>,
    threshold: AdaptiveThreshold,
    recent_alerts: VecDeque<DriftAlert>,
    total_checks: u64,
    total_detections: u64,
    last_confidence: f64,
}

impl DriftDetector {
    pub fn new(config: DriftConfig) -> Self {
        let threshold = AdaptiveThreshold::new(&config);
        Self {
            history: VecDeque::with_capacity(config.window_size),
            recent_alerts: VecDeque::with_capacity(config.alert_capacity),
            threshold,
            config,
            total_checks: 0,
            total_detections: 0,
            last_confidence: 0.0,
        }
    }

    pub fn config(&self) -> &DriftConfig {
        &self.config
    }

    /// Run one detection cycle and record `current` into the history
    pub fn detect_drift(&mut self, current: &QualityMetrics) -> Option<DriftAlert> {
        self.total_checks += 1;

        if !self.is_warmed_up() {
            self.push_history(*current);
            debug!(
                "Drift detector warming up: {}/{} samples",
                self.history.len(),
                self.config.min_samples
            );
            return None;
        }

        let families = self.evaluate_families(current);
        self.push_history(*current);

        let threshold = self.threshold.current();
        let mut triggered = BTreeSet::new();
        let mut confidence = 0.0;
        let mut leading = None;
        for (family, family_confidence) in families.ordered() {
            if family_confidence > threshold {
                triggered.insert(family);
                // strict comparison keeps the earliest family on ties
                if leading.is_none() || family_confidence > confidence {
                    confidence = family_confidence;
                    leading = Some(family);
                }
            }
        }

        let alert = leading.map(|family| {
            self.build_alert(current, &families, triggered, confidence, family, threshold)
        });

        let max_confidence = families.max();
        self.threshold.update(alert.is_some(), max_confidence);
        self.last_confidence = max_confidence;

        if let Some(alert) = &alert {
            self.total_detections += 1;
            warn!(
                "Drift detected: {:?}/{:?} confidence={:.3} threshold={:.3}",
                alert.severity, alert.drift_type, alert.confidence, threshold
            );
            if self.recent_alerts.len() >= self.config.alert_capacity.max(1) {
                self.recent_alerts.pop_front();
            }
            self.recent_alerts.push_back(alert.clone());
        }

        alert
    }

    /// Family confidences of `current` against the recorded history
    ///
    /// Families whose history requirement is not met report 0.
    pub fn evaluate_families(&self, current: &QualityMetrics) -> FamilyConfidences {
        let scores: Vec<f64> = self.history.iter().map(|m| m.quality_score).collect();

        let statistical = self.statistical_confidence(current, &scores);
        let pattern = if self.history.len() >= PATTERN_MIN_HISTORY {
            self.pattern_confidence(current, &scores)
        } else {
            0.0
        };
        let trend = if self.history.len() >= TREND_MIN_HISTORY {
            self.trend_signals(current, &scores)
        } else {
            TrendSignals::default()
        };

        FamilyConfidences {
            statistical,
            pattern,
            trend: trend.confidence(),
            linear_trend: trend.linear,
            volatility: trend.volatility,
        }
    }

    fn statistical_confidence(&self, current: &QualityMetrics, scores: &[f64]) -> f64 {
        if scores.is_empty() {
            return 0.0;
        }
        let floor = self.config.min_score_spread;
        let x = current.quality_score;

        // KS-style position of the current score in the historical distribution,
        // counted only for a clear departure from a history that actually varies
        let history_sd = std_dev(scores);
        let ks = if history_sd < SPREAD_EPSILON {
            0.0
        } else {
            let effect = (x - median(scores)).abs() / history_sd.max(floor);
            if effect < self.config.min_effect_size {
                0.0
            } else {
                let tail = mid_rank_tail(x, scores);
                scaled_confidence(KS_TAIL_CUTOFF - tail, 0.0, KS_TAIL_CUTOFF)
            }
        };

        // Multi-metric Z-test with a Bonferroni-style correction
        let selectors: [fn(&QualityMetrics) -> f64; Z_TEST_METRICS] = [
            |m| m.mean_magnitude,
            |m| m.std_magnitude,
            |m| m.mean_dimensionality_usage,
            |m| m.inter_vector_similarity,
            |m| m.distribution_entropy,
        ];
        let max_z = selectors
            .iter()
            .map(|select| {
                let values: Vec<f64> = self.history.iter().map(select).collect();
                z_score(select(current), &values)
            })
            .fold(0.0, f64::max);
        let z_adjusted = max_z / (Z_TEST_METRICS as f64).sqrt();
        let z_test = scaled_confidence(z_adjusted, 1.0, 4.0);

        // Welch-style comparison against the recent mean
        let recent = tail_slice(scores, self.config.recent_window.max(2));
        let n = recent.len() as f64;
        let recent_sd = std_dev(recent).max(floor);
        let t = (x - mean(recent)).abs() / (recent_sd * (1.0 + 1.0 / n).sqrt());
        let t_test = scaled_confidence(t, T_TEST_OFFSET, 4.0);

        ks.max(z_test).max(t_test)
    }

    fn pattern_confidence(&self, current: &QualityMetrics, scores: &[f64]) -> f64 {
        let floor = self.config.min_score_spread;
        let point = features(current);

        // Local outlier ratio: distance to the recent neighbours relative to
        // the neighbours' own leave-one-out distances
        let k = self.config.neighbor_count.clamp(2, self.history.len());
        let neighbors: Vec<[f64; 3]> = self.history.iter().rev().take(k).map(features).collect();
        let current_reach = neighbors.iter().map(|n| euclidean(&point, n)).sum::<f64>() / k as f64;
        let neighbor_reach = neighbors
            .iter()
            .enumerate()
            .map(|(i, a)| {
                neighbors
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(_, b)| euclidean(a, b))
                    .sum::<f64>()
                    / (k - 1) as f64
            })
            .sum::<f64>()
            / k as f64;
        let local_outlier = scaled_confidence(
            current_reach / neighbor_reach.max(floor),
            LOCAL_OUTLIER_OFFSET,
            4.0,
        );

        // Combined multivariate Z-score
        let selectors: [fn(&QualityMetrics) -> f64; 3] = [
            |m| m.quality_score,
            |m| m.mean_dimensionality_usage,
            |m| m.inter_vector_similarity,
        ];
        let sum_squares: f64 = selectors
            .iter()
            .map(|select| {
                let values: Vec<f64> = self.history.iter().map(select).collect();
                floored_z_score(select(current), &values, floor).powi(2)
            })
            .sum();
        let combined_z = (sum_squares / selectors.len() as f64).sqrt();
        let multivariate = scaled_confidence(combined_z, 2.0, 4.0);

        // Error of a least-squares extrapolation of the recent scores, in units
        // of the history spread widened by the extrapolation variance
        let recent = tail_slice(scores, PREDICTION_WINDOW);
        let temporal = if recent.len() < 2 {
            0.0
        } else {
            let n = recent.len() as f64;
            let x_mean = (n - 1.0) / 2.0;
            let sxx: f64 = (0..recent.len()).map(|i| (i as f64 - x_mean).powi(2)).sum();
            let (slope, _) = linear_fit(recent);
            let predicted = mean(recent) + slope * (n - x_mean);
            let spread = std_dev(scores).max(floor)
                * (1.0 + 1.0 / n + (n - x_mean).powi(2) / sxx).sqrt();
            let error = (current.quality_score - predicted).abs() / spread;
            scaled_confidence(error, TEMPORAL_OFFSET, 4.0)
        };

        local_outlier.max(multivariate).max(temporal)
    }

    fn trend_signals(&self, current: &QualityMetrics, scores: &[f64]) -> TrendSignals {
        let floor = self.config.min_score_spread;
        let window_len = self.config.trend_window.clamp(4, MAX_TREND_WINDOW);
        let mut window: Vec<f64> = tail_slice(scores, window_len - 1).to_vec();
        window.push(current.quality_score);
        let n = window.len();
        let history_sd = std_dev(scores).max(floor);

        // a fit only counts once it explains clearly more than noise would
        let (slope, r_squared) = linear_fit(&window);
        let linear = scaled_confidence(r_squared, MIN_TREND_FIT, 1.0 - MIN_TREND_FIT)
            * scaled_confidence(slope.abs() * (n - 1) as f64, 0.0, self.config.trend_change_scale);

        let half = n / 2;
        let shift = (mean(&window[..half]) - mean(&window[half..])).abs();
        let shift_z = shift / (history_sd * (1.0 / half as f64 + 1.0 / (n - half) as f64).sqrt());
        let change_point = scaled_confidence(shift_z, CHANGE_POINT_OFFSET, 4.0);

        let mut full = scores.to_vec();
        full.push(current.quality_score);
        let recent = tail_slice(&window, self.config.recent_window.max(2));
        let volatility_ratio = std_dev(recent) / std_dev(&full).max(floor);
        let volatility = scaled_confidence(volatility_ratio, VOLATILITY_OFFSET, 2.0);

        TrendSignals {
            linear,
            change_point,
            volatility,
        }
    }

    fn classify(&self, families: &FamilyConfidences) -> DriftType {
        if families.linear_trend > self.config.gradual_trend_strength {
            DriftType::Gradual
        } else if families.volatility > self.config.sudden_volatility {
            DriftType::Sudden
        } else {
            DriftType::Outlier
        }
    }

    fn build_alert(
        &self,
        current: &QualityMetrics,
        families: &FamilyConfidences,
        triggered: BTreeSet<DetectionFamily>,
        confidence: f64,
        leading: DetectionFamily,
        threshold: f64,
    ) -> DriftAlert {
        let severity = DriftSeverity::from_confidence(confidence, &self.config.severity_bands);
        let drift_type = self.classify(families);

        let description = format!(
            "{:?} drift detected by the {} family: confidence {:.2} exceeds threshold {:.2} (quality score {:.3})",
            drift_type, leading, confidence, threshold, current.quality_score
        );

        DriftAlert {
            id: Uuid::new_v4(),
            severity,
            drift_type,
            affected_metrics: triggered,
            confidence,
            timestamp_ns: current.timestamp_ns,
            raised_at: Utc::now(),
            description,
            recommendations: recommendations_for(drift_type, severity),
        }
    }

    fn push_history(&mut self, metrics: QualityMetrics) {
        let capacity = self.config.window_size.max(1);
        while self.history.len() >= capacity {
            self.history.pop_front();
        }
        self.history.push_back(metrics);
    }

    pub fn is_warmed_up(&self) -> bool {
        self.history.len() >= self.config.min_samples
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Current adaptive threshold value
    pub fn threshold(&self) -> f64 {
        self.threshold.current()
    }

    pub fn adaptive_threshold(&self) -> &AdaptiveThreshold {
        &self.threshold
    }

    /// Most recent alerts, newest first
    pub fn recent_alerts(&self, limit: usize) -> Vec<DriftAlert> {
        self.recent_alerts.iter().rev().take(limit).cloned().collect()
    }

    /// Scrape-style snapshot of detector state
    pub fn detection_statistics(&self) -> BTreeMap<String, f64> {
        let mut stats = BTreeMap::new();
        let detection_rate = if self.total_checks > 0 {
            self.total_detections as f64 / self.total_checks as f64
        } else {
            0.0
        };

        stats.insert("total_checks".to_string(), self.total_checks as f64);
        stats.insert("total_detections".to_string(), self.total_detections as f64);
        stats.insert("detection_rate".to_string(), detection_rate);
        stats.insert("current_threshold".to_string(), self.threshold.current());
        stats.insert("base_threshold".to_string(), self.threshold.base_threshold);
        stats.insert("history_size".to_string(), self.history.len() as f64);
        stats.insert("min_samples".to_string(), self.config.min_samples as f64);
        stats.insert("recent_alerts".to_string(), self.recent_alerts.len() as f64);
        stats.insert(
            "warmed_up".to_string(),
            if self.is_warmed_up() { 1.0 } else { 0.0 },
        );
        stats.insert("last_confidence".to_string(), self.last_confidence);
        stats
    }

    /// Forget history, alerts and threshold adaptation
    pub fn reset(&mut self) {
        self.history.clear();
        self.recent_alerts.clear();
        self.threshold.reset();
        self.total_checks = 0;
        self.total_detections = 0;
        self.last_confidence = 0.0;
    }
}

fn features(metrics: &QualityMetrics) -> [f64; 3] {
    [
        metrics.quality_score,
        metrics.mean_dimensionality_usage,
        metrics.inter_vector_similarity,
    ]
}

fn tail_slice(values: &[f64], len: usize) -> &[f64] {
    &values[values.len().saturating_sub(len)..]
}

fn recommendations_for(drift_type: DriftType, severity: DriftSeverity) -> Vec<String> {
    let mut recommendations = Vec::new();

    match drift_type {
        DriftType::Gradual => {
            recommendations.push("Schedule index parameter retuning for the shifted distribution".to_string());
            recommendations.push("Review recent changes to the embedding model or preprocessing".to_string());
        }
        DriftType::Sudden => {
            recommendations.push("Partially reindex recently ingested vectors".to_string());
            recommendations.push("Check the latest ingestion batches for a source change".to_string());
        }
        DriftType::Cyclic => {
            recommendations.push("Align maintenance windows with the observed cycle".to_string());
        }
        DriftType::Outlier => {
            recommendations.push("Inspect the latest sample for anomalous vectors".to_string());
        }
    }

    if severity >= DriftSeverity::High {
        recommendations.push("Verify search recall against a held-out query set".to_string());
    }
    if severity == DriftSeverity::Critical {
        recommendations.push("Investigate the upstream embedding pipeline immediately".to_string());
    }

    recommendations
}
