// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Sentinel configuration
//!
//! Every field has a default, so a configuration file only needs to name the
//! values it overrides. Files are layered with `PROXIMA_SENTINEL__*`
//! environment variables, e.g. `PROXIMA_SENTINEL__DRIFT__MIN_SAMPLES=20`.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::error::{ConfigError, Result};

/// Hard cap on sampled similarity pairs per metrics computation
pub const MAX_SIMILARITY_PAIRS: usize = 100;

/// Hard cap on magnitude histogram bins
pub const MAX_HISTOGRAM_BINS: usize = 20;

/// Lower clamp of the adaptive drift threshold
pub const MIN_DRIFT_THRESHOLD: f64 = 0.01;

/// Upper clamp of the adaptive drift threshold
pub const MAX_DRIFT_THRESHOLD: f64 = 0.5;

/// Lower clamp of the adaptive sampling rate
pub const MIN_SAMPLING_RATE: f64 = 0.01;

/// Upper clamp of the adaptive sampling rate
pub const MAX_SAMPLING_RATE: f64 = 1.0;

const ENV_PREFIX: &str = "PROXIMA_SENTINEL";

/// Top-level configuration for one monitored collection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    pub quality: QualityConfig,
    pub drift: DriftConfig,
    pub monitoring: MonitoringConfig,
    pub adaptation: AdaptationConfig,
}

/// Quality metrics engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Vectors sampled per computation when the caller does not say
    pub default_sample_size: usize,

    /// Similarity pairs per computation, never above [`MAX_SIMILARITY_PAIRS`]
    pub max_similarity_pairs: usize,

    /// Magnitude histogram bins, never above [`MAX_HISTOGRAM_BINS`]
    pub histogram_bins: usize,

    /// Components with an absolute value at or below this count as unused
    pub zero_epsilon: f64,

    /// Composite score weights
    pub weights: QualityWeights,

    /// Operator recommendation thresholds
    pub recommendations: RecommendationThresholds,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            default_sample_size: 1000,
            max_similarity_pairs: MAX_SIMILARITY_PAIRS,
            histogram_bins: MAX_HISTOGRAM_BINS,
            zero_epsilon: 1e-8,
            weights: QualityWeights::default(),
            recommendations: RecommendationThresholds::default(),
        }
    }
}

/// Weights of the composite quality score sub-scores
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityWeights {
    pub dimensionality: f64,
    pub diversity: f64,
    pub entropy: f64,
    pub magnitude_consistency: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            dimensionality: 0.3,
            diversity: 0.3,
            entropy: 0.2,
            magnitude_consistency: 0.2,
        }
    }
}

impl QualityWeights {
    pub fn total(&self) -> f64 {
        self.dimensionality + self.diversity + self.entropy + self.magnitude_consistency
    }
}

/// Thresholds behind the human-readable quality recommendations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationThresholds {
    pub low_quality_score: f64,
    pub sparse_usage: f64,
    pub high_similarity: f64,
    pub low_entropy_bits: f64,
    pub high_magnitude_variation: f64,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            low_quality_score: 0.5,
            sparse_usage: 0.3,
            high_similarity: 0.9,
            low_entropy_bits: 2.0,
            high_magnitude_variation: 0.5,
        }
    }
}

/// Drift detector settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Base detection threshold the adaptive threshold relaxes toward
    pub sensitivity_threshold: f64,

    /// Rolling metrics history capacity
    pub window_size: usize,

    /// History length required before any detection runs
    pub min_samples: usize,

    /// Proportional gain of the detection-rate correction
    pub adaptation_rate: f64,

    /// Weight kept by the current threshold on each smoothing step
    pub stability_factor: f64,

    /// Recent detection outcomes considered for the detection rate
    pub outcome_window: usize,

    /// Detection rate above which the threshold is raised
    pub high_detection_rate: f64,

    /// Detection rate below which the threshold is lowered
    pub low_detection_rate: f64,

    /// Recent alerts retained for inspection
    pub alert_capacity: usize,

    /// Confidence bands mapped to alert severity
    pub severity_bands: SeverityBands,

    /// Recent neighbours used by the local outlier score
    pub neighbor_count: usize,

    /// Smallest spread treated as real variation; deviations are measured
    /// against at least this much
    pub min_score_spread: f64,

    /// Distance from the history median, in spreads, before the rank test counts
    pub min_effect_size: f64,

    /// Recent samples used by the t-test and the volatility ratio
    pub recent_window: usize,

    /// Samples used by the trend family
    pub trend_window: usize,

    /// Quality-score change across the trend window that counts as full strength
    pub trend_change_scale: f64,

    /// Trend strength above which drift is classified as gradual
    pub gradual_trend_strength: f64,

    /// Volatility confidence above which drift is classified as sudden
    pub sudden_volatility: f64,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            sensitivity_threshold: 0.15,
            window_size: 100,
            min_samples: 50,
            adaptation_rate: 0.1,
            stability_factor: 0.95,
            outcome_window: 20,
            high_detection_rate: 0.3,
            low_detection_rate: 0.05,
            alert_capacity: 100,
            severity_bands: SeverityBands::default(),
            neighbor_count: 10,
            min_score_spread: 0.01,
            min_effect_size: 3.0,
            recent_window: 10,
            trend_window: 20,
            trend_change_scale: 0.2,
            gradual_trend_strength: 0.6,
            sudden_volatility: 0.5,
        }
    }
}

/// Lower confidence bounds (exclusive) of each alert severity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityBands {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
}

impl Default for SeverityBands {
    fn default() -> Self {
        Self {
            critical: 0.8,
            high: 0.6,
            medium: 0.4,
        }
    }
}

/// Performance monitor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Overhead ceiling as a percentage of tracked operation time
    pub target_overhead_percent: f64,

    /// Multiplicative sampling-rate step
    pub adjustment_factor: f64,

    /// Sampling rate at construction
    pub initial_sampling_rate: f64,

    /// Capacity of the metrics ring buffer
    pub metrics_capacity: usize,

    /// Recent overhead measurements kept by the sampler
    pub overhead_window: usize,

    /// Assumed fixed cost of tracking one operation
    pub monitoring_cost_ns: u64,

    /// Weight of a new overhead measurement in the moving average
    pub overhead_smoothing: f64,

    /// Weight of a new latency in the per-operation baseline
    pub baseline_smoothing: f64,

    /// Recent latencies per operation type compared against the baseline
    pub regression_window: usize,

    /// Relative latency increase treated as a regression
    pub regression_threshold: f64,

    /// Seed for the sampling decision; entropy-seeded when absent
    pub seed: Option<u64>,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            target_overhead_percent: 1.0,
            adjustment_factor: 0.1,
            initial_sampling_rate: 1.0,
            metrics_capacity: 1000,
            overhead_window: 20,
            monitoring_cost_ns: 100,
            overhead_smoothing: 0.05,
            baseline_smoothing: 0.1,
            regression_window: 10,
            regression_threshold: 0.2,
            seed: None,
        }
    }
}

/// Adaptive index manager settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptationConfig {
    /// Cumulative resource cost admitted per evaluation
    pub resource_budget: f64,

    /// Minimum time between two executed adaptations
    pub cooldown_ms: u64,

    /// Composite score below which a full reindex is proposed
    pub rebuild_threshold: f64,

    /// Dimensionality usage below which parameters are retuned
    pub sparsity_threshold: f64,

    /// Inter-vector similarity above which pruning is proposed
    pub similarity_threshold: f64,

    /// Confidence above which sudden drift triggers a partial reindex
    pub sudden_drift_confidence: f64,

    /// Collection growth since the last rebuild that triggers expansion
    pub expansion_growth_ratio: f64,

    /// Adaptation history capacity
    pub history_capacity: usize,

    /// Records kept when the history overflows
    pub history_retain: usize,

    /// Vectors sampled per evaluation
    pub evaluation_sample_size: usize,
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            resource_budget: 0.1,
            cooldown_ms: 300_000, // 5 minutes
            rebuild_threshold: 0.3,
            sparsity_threshold: 0.3,
            similarity_threshold: 0.9,
            sudden_drift_confidence: 0.7,
            expansion_growth_ratio: 2.0,
            history_capacity: 100,
            history_retain: 50,
            evaluation_sample_size: 1000,
        }
    }
}

impl AdaptationConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

impl SentinelConfig {
    /// Load from a configuration file layered with environment overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(ConfigError::from)?;

        let parsed: SentinelConfig = settings.try_deserialize().map_err(ConfigError::from)?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Parse a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let parsed: SentinelConfig = toml::from_str(source).map_err(ConfigError::from)?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Reject values that would break component invariants
    pub fn validate(&self) -> Result<()> {
        let q = &self.quality;
        if q.max_similarity_pairs == 0 || q.max_similarity_pairs > MAX_SIMILARITY_PAIRS {
            return Err(ConfigError::invalid(
                "quality.max_similarity_pairs",
                format!("must be in 1..={}", MAX_SIMILARITY_PAIRS),
            )
            .into());
        }
        if q.histogram_bins < 2 || q.histogram_bins > MAX_HISTOGRAM_BINS {
            return Err(ConfigError::invalid(
                "quality.histogram_bins",
                format!("must be in 2..={}", MAX_HISTOGRAM_BINS),
            )
            .into());
        }
        if (q.weights.total() - 1.0).abs() > 1e-6 {
            return Err(ConfigError::invalid(
                "quality.weights",
                format!("must sum to 1.0, got {:.4}", q.weights.total()),
            )
            .into());
        }

        let d = &self.drift;
        if !(MIN_DRIFT_THRESHOLD..=MAX_DRIFT_THRESHOLD).contains(&d.sensitivity_threshold) {
            return Err(ConfigError::invalid(
                "drift.sensitivity_threshold",
                format!("must be in [{}, {}]", MIN_DRIFT_THRESHOLD, MAX_DRIFT_THRESHOLD),
            )
            .into());
        }
        if d.window_size == 0 || d.min_samples > d.window_size {
            return Err(ConfigError::invalid(
                "drift.min_samples",
                "must not exceed a non-zero drift.window_size",
            )
            .into());
        }
        if d.outcome_window == 0 || d.outcome_window > 20 {
            return Err(ConfigError::invalid("drift.outcome_window", "must be in 1..=20").into());
        }
        if d.trend_window < 4 || d.trend_window > 20 {
            return Err(ConfigError::invalid("drift.trend_window", "must be in 4..=20").into());
        }
        if d.min_score_spread <= 0.0 || d.min_effect_size < 0.0 {
            return Err(ConfigError::invalid(
                "drift.min_score_spread",
                "spread floor must be positive and effect size non-negative",
            )
            .into());
        }
        if !(0.0..1.0).contains(&d.stability_factor) {
            return Err(ConfigError::invalid("drift.stability_factor", "must be in [0, 1)").into());
        }

        let m = &self.monitoring;
        if m.target_overhead_percent <= 0.0 {
            return Err(ConfigError::invalid(
                "monitoring.target_overhead_percent",
                "must be positive",
            )
            .into());
        }
        if !(0.0..1.0).contains(&m.adjustment_factor) || m.adjustment_factor == 0.0 {
            return Err(ConfigError::invalid(
                "monitoring.adjustment_factor",
                "must be in (0, 1)",
            )
            .into());
        }
        if !(MIN_SAMPLING_RATE..=MAX_SAMPLING_RATE).contains(&m.initial_sampling_rate) {
            return Err(ConfigError::invalid(
                "monitoring.initial_sampling_rate",
                format!("must be in [{}, {}]", MIN_SAMPLING_RATE, MAX_SAMPLING_RATE),
            )
            .into());
        }
        if m.metrics_capacity == 0 || m.overhead_window == 0 || m.regression_window == 0 {
            return Err(ConfigError::invalid(
                "monitoring",
                "buffer capacities and windows must be non-zero",
            )
            .into());
        }

        let a = &self.adaptation;
        if a.resource_budget <= 0.0 {
            return Err(ConfigError::invalid("adaptation.resource_budget", "must be positive").into());
        }
        if a.history_retain == 0 || a.history_retain > a.history_capacity {
            return Err(ConfigError::invalid(
                "adaptation.history_retain",
                "must be in 1..=adaptation.history_capacity",
            )
            .into());
        }
        if a.expansion_growth_ratio <= 1.0 {
            return Err(ConfigError::invalid(
                "adaptation.expansion_growth_ratio",
                "must be greater than 1.0",
            )
            .into());
        }

        Ok(())
    }
}
