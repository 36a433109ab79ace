// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Bounded-cost statistical helpers shared by the detection families
//!
//! Every helper returns a neutral value (0) for empty input or zero spread.

/// Spread below which a distribution is treated as constant
pub const SPREAD_EPSILON: f64 = 1e-9;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        0.5 * (sorted[mid - 1] + sorted[mid])
    } else {
        sorted[mid]
    }
}

/// Absolute z-score of `value` against `values`; 0 for a constant reference
pub fn z_score(value: f64, values: &[f64]) -> f64 {
    floored_z_score(value, values, 0.0)
}

/// Absolute z-score measured against `max(std_dev, floor)`
///
/// Still 0 for a constant reference, so deviations are only meaningful once
/// the reference itself varies.
pub fn floored_z_score(value: f64, values: &[f64], floor: f64) -> f64 {
    let sd = std_dev(values);
    if sd < SPREAD_EPSILON {
        return 0.0;
    }
    ((value - mean(values)) / sd.max(floor)).abs()
}

/// Two-sided tail fraction of `value` under the mid-rank empirical CDF
///
/// Returns 0.5 when the value sits at the median, approaching 0 at the
/// extremes of the reference distribution.
pub fn mid_rank_tail(value: f64, reference: &[f64]) -> f64 {
    if reference.is_empty() {
        return 0.5;
    }
    let below = reference.iter().filter(|&&r| r < value).count() as f64;
    let equal = reference.iter().filter(|&&r| r == value).count() as f64;
    let cdf = (below + 0.5 * equal) / reference.len() as f64;
    cdf.min(1.0 - cdf)
}

/// Least-squares slope over the index and coefficient of determination
pub fn linear_fit(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n < 2 {
        return (0.0, 0.0);
    }

    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(values);

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        let dy = y - y_mean;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx < SPREAD_EPSILON {
        return (0.0, 0.0);
    }
    let slope = sxy / sxx;
    let r_squared = if syy < SPREAD_EPSILON {
        0.0
    } else {
        (sxy * sxy) / (sxx * syy)
    };
    (slope, r_squared.clamp(0.0, 1.0))
}

/// Map `value` linearly onto [0, 1], starting at `offset` and saturating after `span`
pub fn scaled_confidence(value: f64, offset: f64, span: f64) -> f64 {
    if !value.is_finite() || span <= 0.0 {
        return 0.0;
    }
    ((value - offset) / span).clamp(0.0, 1.0)
}

pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}
