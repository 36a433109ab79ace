// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Drift Detector - distributional drift over a rolling quality-metrics history
//!
//! Three independent families of bounded-cost tests (statistical, pattern and
//! trend) are evaluated against a self-tuning threshold. Below the warm-up
//! sample count the detector only records history.

pub mod detector;
pub mod statistics;
pub mod threshold;
pub mod types;

#[cfg(test)]
pub mod detector_tests;

pub use detector::{DriftDetector, FamilyConfidences};
pub use threshold::AdaptiveThreshold;
pub use types::{DetectionFamily, DriftAlert, DriftSeverity, DriftType};
