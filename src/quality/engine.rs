// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Sampled quality metrics computation

use std::sync::Arc;

use crate::core::{
    Clock, QualityConfig, QualityMetrics, SystemClock, VectorSource, MAX_HISTOGRAM_BINS,
    MAX_SIMILARITY_PAIRS,
};

/// Computes [`QualityMetrics`] over a bounded, deterministic sample
pub struct QualityMetricsEngine {
    config: QualityConfig,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for QualityMetricsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QualityMetricsEngine")
            .field("config", &self.config)
            .finish()
    }
}

/// Normalized sub-scores behind the composite quality score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubScores {
    pub dimensionality: f64,
    pub diversity: f64,
    pub entropy: f64,
    pub magnitude_consistency: f64,
}

impl QualityMetricsEngine {
    pub fn new(config: QualityConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(config: QualityConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Compute metrics over at most `sample_size` vectors of `vectors`
    pub fn compute_metrics(&self, vectors: &dyn VectorSource, sample_size: usize) -> QualityMetrics {
        let timestamp_ns = self.clock.now_nanos();
        let indices = strided_indices(vectors.len(), sample_size);
        if indices.is_empty() {
            return QualityMetrics::empty(timestamp_ns);
        }

        let sample: Vec<&[f32]> = indices.iter().map(|&i| vectors.vector(i)).collect();

        let magnitudes: Vec<f64> = sample.iter().copied().map(magnitude).collect();
        let (mean_magnitude, std_magnitude) = mean_and_std(&magnitudes);

        let mean_dimensionality_usage = sample
            .iter()
            .map(|v| dimensionality_usage(v, self.config.zero_epsilon))
            .sum::<f64>()
            / sample.len() as f64;

        let inter_vector_similarity = self.pairwise_similarity(&sample, &magnitudes);
        let bins = self.histogram_bins();
        let distribution_entropy = magnitude_entropy(&magnitudes, bins);

        let mut metrics = QualityMetrics {
            mean_magnitude,
            std_magnitude,
            mean_dimensionality_usage,
            inter_vector_similarity,
            distribution_entropy,
            quality_score: 0.0,
            sample_size: sample.len(),
            timestamp_ns,
        };
        metrics.quality_score = self.composite_score(&metrics);
        metrics
    }

    /// Compute with the configured default sample size
    pub fn compute_default(&self, vectors: &dyn VectorSource) -> QualityMetrics {
        self.compute_metrics(vectors, self.config.default_sample_size)
    }

    /// Normalized sub-scores of `metrics`, each in [0, 1]
    pub fn sub_scores(&self, metrics: &QualityMetrics) -> SubScores {
        let max_entropy = (self.histogram_bins() as f64).log2();
        let variation = metrics.magnitude_variation();

        SubScores {
            dimensionality: metrics.mean_dimensionality_usage.clamp(0.0, 1.0),
            diversity: (1.0 - metrics.inter_vector_similarity.abs()).clamp(0.0, 1.0),
            entropy: if max_entropy > 0.0 {
                (metrics.distribution_entropy / max_entropy).clamp(0.0, 1.0)
            } else {
                0.0
            },
            magnitude_consistency: if metrics.mean_magnitude > f64::EPSILON {
                1.0 / (1.0 + variation)
            } else {
                0.0
            },
        }
    }

    /// Weighted composite of the sub-scores, clamped to [0, 1]
    pub fn composite_score(&self, metrics: &QualityMetrics) -> f64 {
        let scores = self.sub_scores(metrics);
        let w = &self.config.weights;

        let score = w.dimensionality * scores.dimensionality
            + w.diversity * scores.diversity
            + w.entropy * scores.entropy
            + w.magnitude_consistency * scores.magnitude_consistency;

        score.clamp(0.0, 1.0)
    }

    fn histogram_bins(&self) -> usize {
        self.config.histogram_bins.clamp(1, MAX_HISTOGRAM_BINS)
    }

    /// Mean cosine similarity over at most [`MAX_SIMILARITY_PAIRS`] sample pairs
    fn pairwise_similarity(&self, sample: &[&[f32]], magnitudes: &[f64]) -> f64 {
        let n = sample.len();
        if n < 2 {
            return 0.0;
        }

        let max_pairs = self.config.max_similarity_pairs.min(MAX_SIMILARITY_PAIRS);
        let mut total = 0.0;
        let mut evaluated = 0usize;

        for (a, b) in similarity_pairs(n, max_pairs) {
            total += cosine_similarity(sample[a], sample[b], magnitudes[a], magnitudes[b]);
            evaluated += 1;
        }

        if evaluated == 0 {
            0.0
        } else {
            (total / evaluated as f64).clamp(-1.0, 1.0)
        }
    }
}

/// Evenly strided indices selecting at most `sample_size` of `len` elements
pub fn strided_indices(len: usize, sample_size: usize) -> Vec<usize> {
    if len == 0 || sample_size == 0 {
        return Vec::new();
    }
    if len <= sample_size {
        return (0..len).collect();
    }

    let stride = len / sample_size;
    (0..sample_size).map(|i| i * stride).collect()
}

/// Deterministic pair schedule over `n` sample positions, capped at `max_pairs`
pub(crate) fn similarity_pairs(n: usize, max_pairs: usize) -> Vec<(usize, usize)> {
    let max_pairs = max_pairs.min(MAX_SIMILARITY_PAIRS);
    let all_pairs = n.saturating_mul(n.saturating_sub(1)) / 2;
    let target = max_pairs.min(all_pairs);
    let mut pairs = Vec::with_capacity(target);

    if all_pairs <= max_pairs {
        for a in 0..n {
            for b in (a + 1)..n {
                pairs.push((a, b));
            }
        }
        return pairs;
    }

    // Walk the sample with a co-prime offset so pairs spread over the whole sample
    let mut p = 0usize;
    while pairs.len() < target {
        let a = p % n;
        let b = (p * 7 + 1) % n;
        if a != b {
            pairs.push((a, b));
        }
        p += 1;
    }
    pairs
}

fn magnitude(v: &[f32]) -> f64 {
    v.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>().sqrt()
}

fn dimensionality_usage(v: &[f32], epsilon: f64) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    let used = v.iter().filter(|&&x| (x as f64).abs() > epsilon).count();
    used as f64 / v.len() as f64
}

fn cosine_similarity(a: &[f32], b: &[f32], norm_a: f64, norm_b: f64) -> f64 {
    if norm_a <= f64::EPSILON || norm_b <= f64::EPSILON {
        return 0.0;
    }
    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| x as f64 * y as f64)
        .sum();
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

pub(crate) fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Shannon entropy (bits) of `values` binned into `bins` equal-width buckets
fn magnitude_entropy(values: &[f64], bins: usize) -> f64 {
    if values.is_empty() || bins == 0 {
        return 0.0;
    }

    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range.is_nan() || range <= f64::EPSILON {
        return 0.0;
    }

    let mut counts = vec![0usize; bins];
    for &v in values {
        let bucket = (((v - min) / range) * bins as f64) as usize;
        counts[bucket.min(bins - 1)] += 1;
    }

    let total = values.len() as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum()
}
