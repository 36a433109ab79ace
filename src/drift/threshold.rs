// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Self-tuning detection threshold

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::core::{DriftConfig, MAX_DRIFT_THRESHOLD, MIN_DRIFT_THRESHOLD};

/// Upper bound on remembered detection outcomes
const MAX_OUTCOME_WINDOW: usize = 20;

/// Detection threshold that relaxes toward its base value and reacts to the
/// recent detection rate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveThreshold {
    pub base_threshold: f64,
    pub current_threshold: f64,
    pub adaptation_rate: f64,
    pub stability_factor: f64,
    high_detection_rate: f64,
    low_detection_rate: f64,
    outcome_window: usize,
    recent_outcomes: VecDeque<bool>,
}

impl AdaptiveThreshold {
    pub fn new(config: &DriftConfig) -> Self {
        let base = config
            .sensitivity_threshold
            .clamp(MIN_DRIFT_THRESHOLD, MAX_DRIFT_THRESHOLD);
        let outcome_window = config.outcome_window.clamp(1, MAX_OUTCOME_WINDOW);

        Self {
            base_threshold: base,
            current_threshold: base,
            adaptation_rate: config.adaptation_rate,
            stability_factor: config.stability_factor,
            high_detection_rate: config.high_detection_rate,
            low_detection_rate: config.low_detection_rate,
            outcome_window,
            recent_outcomes: VecDeque::with_capacity(outcome_window),
        }
    }

    pub fn current(&self) -> f64 {
        self.current_threshold
    }

    /// Fraction of recent cycles that detected drift
    pub fn detection_rate(&self) -> f64 {
        if self.recent_outcomes.is_empty() {
            return 0.0;
        }
        let detections = self.recent_outcomes.iter().filter(|&&d| d).count();
        detections as f64 / self.recent_outcomes.len() as f64
    }

    pub fn outcomes_len(&self) -> usize {
        self.recent_outcomes.len()
    }

    /// Fold one detection cycle into the threshold
    ///
    /// `confidence` is the largest family confidence of the cycle, whether or
    /// not it crossed the threshold.
    pub fn update(&mut self, detected: bool, confidence: f64) {
        if self.recent_outcomes.len() == self.outcome_window {
            self.recent_outcomes.pop_front();
        }
        self.recent_outcomes.push_back(detected);

        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let rate = self.detection_rate();

        let mut next = self.stability_factor * self.current_threshold
            + (1.0 - self.stability_factor) * self.base_threshold;

        if rate > self.high_detection_rate {
            next += self.adaptation_rate * (rate - self.high_detection_rate);
        } else if rate < self.low_detection_rate {
            next -= self.adaptation_rate * (self.low_detection_rate - rate) * (1.0 - confidence);
        }

        self.current_threshold = if next.is_finite() {
            next.clamp(MIN_DRIFT_THRESHOLD, MAX_DRIFT_THRESHOLD)
        } else {
            self.base_threshold
        };
    }

    pub fn reset(&mut self) {
        self.current_threshold = self.base_threshold;
        self.recent_outcomes.clear();
    }
}
