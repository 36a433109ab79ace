// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Adaptive sampling rate control

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use tracing::debug;

use crate::core::{MonitoringConfig, MAX_SAMPLING_RATE, MIN_SAMPLING_RATE};

/// Sampling rate that backs off when monitoring overhead exceeds its target
#[derive(Debug, Clone)]
pub struct AdaptiveSampling {
    /// Probability that an operation is tracked
    pub current_rate: f64,

    /// Overhead ceiling in percent
    pub target_overhead: f64,

    /// Multiplicative step applied per update
    pub adjustment_factor: f64,

    recent_overheads: VecDeque<f64>,
    window: usize,
    rng: StdRng,
}

impl AdaptiveSampling {
    pub fn new(config: &MonitoringConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            current_rate: clamp_rate(config.initial_sampling_rate),
            target_overhead: config.target_overhead_percent,
            adjustment_factor: config.adjustment_factor.clamp(0.0, 1.0),
            recent_overheads: VecDeque::with_capacity(config.overhead_window),
            window: config.overhead_window.max(1),
            rng,
        }
    }

    /// Bernoulli draw with probability `current_rate`
    pub fn should_sample(&mut self) -> bool {
        if self.current_rate >= MAX_SAMPLING_RATE {
            return true;
        }
        self.rng.gen::<f64>() < self.current_rate
    }

    /// Feed one overhead measurement (percent) and adjust the rate
    ///
    /// Returns the rate after adjustment.
    pub fn update(&mut self, overhead_percent: f64) -> f64 {
        if !overhead_percent.is_finite() {
            return self.current_rate;
        }

        if self.recent_overheads.len() >= self.window {
            self.recent_overheads.pop_front();
        }
        self.recent_overheads.push_back(overhead_percent);

        let previous = self.current_rate;
        if overhead_percent > self.target_overhead {
            self.current_rate = clamp_rate(previous * (1.0 - self.adjustment_factor));
        } else if overhead_percent < self.target_overhead / 2.0 {
            self.current_rate = clamp_rate(previous * (1.0 + self.adjustment_factor / 2.0));
        }

        if self.current_rate != previous {
            debug!(
                "Sampling rate {:.4} -> {:.4} (overhead {:.3}%, target {:.3}%)",
                previous, self.current_rate, overhead_percent, self.target_overhead
            );
        }
        self.current_rate
    }

    pub fn current_rate(&self) -> f64 {
        self.current_rate
    }

    pub fn recent_overhead_count(&self) -> usize {
        self.recent_overheads.len()
    }

    /// Mean of the retained overhead measurements
    pub fn average_overhead(&self) -> f64 {
        if self.recent_overheads.is_empty() {
            return 0.0;
        }
        self.recent_overheads.iter().sum::<f64>() / self.recent_overheads.len() as f64
    }
}

fn clamp_rate(rate: f64) -> f64 {
    if rate.is_nan() {
        return MAX_SAMPLING_RATE;
    }
    rate.clamp(MIN_SAMPLING_RATE, MAX_SAMPLING_RATE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> AdaptiveSampling {
        AdaptiveSampling::new(&MonitoringConfig {
            seed: Some(7),
            ..MonitoringConfig::default()
        })
    }

    #[test]
    fn test_full_rate_always_samples() {
        let mut sampling = seeded();
        assert!((0..1000).all(|_| sampling.should_sample()));
    }

    #[test]
    fn test_high_overhead_backs_off() {
        let mut sampling = seeded();
        let rate = sampling.update(5.0);
        assert!((rate - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_low_overhead_recovers_within_bounds() {
        let mut sampling = seeded();
        sampling.current_rate = 0.5;
        let rate = sampling.update(0.1);
        assert!((rate - 0.525).abs() < 1e-12);

        for _ in 0..200 {
            sampling.update(0.0);
        }
        assert_eq!(sampling.current_rate(), MAX_SAMPLING_RATE);
    }

    #[test]
    fn test_dead_band_keeps_rate() {
        let mut sampling = seeded();
        sampling.current_rate = 0.4;
        assert_eq!(sampling.update(0.75), 0.4);
    }

    #[test]
    fn test_rate_floor() {
        let mut sampling = seeded();
        for _ in 0..500 {
            sampling.update(100.0);
        }
        assert_eq!(sampling.current_rate(), MIN_SAMPLING_RATE);
        assert_eq!(sampling.recent_overhead_count(), 20);
    }

    #[test]
    fn test_non_finite_overhead_ignored() {
        let mut sampling = seeded();
        assert_eq!(sampling.update(f64::NAN), 1.0);
        assert_eq!(sampling.update(f64::INFINITY), 1.0);
        assert_eq!(sampling.recent_overhead_count(), 0);
    }

    #[test]
    fn test_seeded_draws_are_reproducible() {
        let mut a = seeded();
        let mut b = seeded();
        a.current_rate = 0.3;
        b.current_rate = 0.3;
        let draws_a: Vec<bool> = (0..100).map(|_| a.should_sample()).collect();
        let draws_b: Vec<bool> = (0..100).map(|_| b.should_sample()).collect();
        assert_eq!(draws_a, draws_b);
        assert!(draws_a.iter().any(|&d| d));
        assert!(draws_a.iter().any(|&d| !d));
    }
}
