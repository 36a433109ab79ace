// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Shared types crossing component boundaries

use serde::{Deserialize, Serialize};

/// Read-only, index-addressable view over a host vector collection
///
/// Implementations must return vectors of a fixed length and must not copy
/// the collection; the quality engine only ever reads a strided sample.
pub trait VectorSource {
    /// Number of vectors in the collection
    fn len(&self) -> usize;

    /// Vector at `index`, `index < len()`
    fn vector(&self, index: usize) -> &[f32];

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl VectorSource for [Vec<f32>] {
    fn len(&self) -> usize {
        <[Vec<f32>]>::len(self)
    }

    fn vector(&self, index: usize) -> &[f32] {
        &self[index]
    }
}

impl VectorSource for Vec<Vec<f32>> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn vector(&self, index: usize) -> &[f32] {
        &self[index]
    }
}

/// Quality snapshot of a sampled collection
///
/// Produced by [`crate::quality::QualityMetricsEngine`] and never mutated
/// afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub mean_magnitude: f64,
    pub std_magnitude: f64,
    /// Fraction of non-near-zero components, in [0, 1]
    pub mean_dimensionality_usage: f64,
    /// Mean pairwise cosine similarity over a bounded pair sample, in [-1, 1]
    pub inter_vector_similarity: f64,
    /// Shannon entropy (bits) of the binned magnitude histogram
    pub distribution_entropy: f64,
    /// Weighted composite score, in [0, 1]
    pub quality_score: f64,
    pub sample_size: usize,
    pub timestamp_ns: u64,
}

impl QualityMetrics {
    /// Neutral metrics for an empty sample
    pub fn empty(timestamp_ns: u64) -> Self {
        Self {
            mean_magnitude: 0.0,
            std_magnitude: 0.0,
            mean_dimensionality_usage: 0.0,
            inter_vector_similarity: 0.0,
            distribution_entropy: 0.0,
            quality_score: 0.0,
            sample_size: 0,
            timestamp_ns,
        }
    }

    /// Coefficient of variation of magnitudes; 0 when the mean is 0
    pub fn magnitude_variation(&self) -> f64 {
        if self.mean_magnitude > f64::EPSILON {
            self.std_magnitude / self.mean_magnitude
        } else {
            0.0
        }
    }
}
