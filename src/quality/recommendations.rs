// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Operator-facing guidance derived from quality metrics

use super::QualityMetricsEngine;
use crate::core::QualityMetrics;

impl QualityMetricsEngine {
    /// Human-readable recommendations for dashboards and logs
    ///
    /// Returns an empty list when every metric is within its threshold.
    pub fn quality_recommendations(&self, metrics: &QualityMetrics) -> Vec<String> {
        let thresholds = &self.config().recommendations;
        let mut recommendations = Vec::new();

        if metrics.sample_size == 0 {
            recommendations
                .push("Collection is empty; quality metrics will be available after ingestion".to_string());
            return recommendations;
        }

        if metrics.quality_score < thresholds.low_quality_score {
            recommendations.push(format!(
                "Low composite quality score ({:.2} < {:.2}); consider rebuilding the index",
                metrics.quality_score, thresholds.low_quality_score
            ));
        }

        if metrics.mean_dimensionality_usage < thresholds.sparse_usage {
            recommendations.push(format!(
                "High sparsity: only {:.1}% of dimensions in use; consider dimensionality reduction or sparse index parameters",
                metrics.mean_dimensionality_usage * 100.0
            ));
        }

        if metrics.inter_vector_similarity > thresholds.high_similarity {
            recommendations.push(format!(
                "High inter-vector similarity ({:.3}); consider deduplicating or pruning near-duplicate vectors",
                metrics.inter_vector_similarity
            ));
        }

        if metrics.distribution_entropy < thresholds.low_entropy_bits {
            recommendations.push(format!(
                "Low magnitude entropy ({:.2} bits); vectors may be concentrated in a narrow region",
                metrics.distribution_entropy
            ));
        }

        let variation = metrics.magnitude_variation();
        if variation > thresholds.high_magnitude_variation {
            recommendations.push(format!(
                "High magnitude variance (coefficient of variation {:.2}); consider normalizing vectors before insertion",
                variation
            ));
        }

        recommendations
    }
}
