// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Drift alert types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::core::SeverityBands;

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DriftSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DriftSeverity {
    /// Map a confidence onto the configured bands
    pub fn from_confidence(confidence: f64, bands: &SeverityBands) -> Self {
        if confidence > bands.critical {
            DriftSeverity::Critical
        } else if confidence > bands.high {
            DriftSeverity::High
        } else if confidence > bands.medium {
            DriftSeverity::Medium
        } else {
            DriftSeverity::Low
        }
    }
}

/// Shape of the detected drift
///
/// `Cyclic` is part of the alert vocabulary for hosts that classify drift
/// themselves; the built-in classifier does not emit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriftType {
    Gradual,
    Sudden,
    Cyclic,
    Outlier,
}

/// Independent detection families, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DetectionFamily {
    Statistical,
    Pattern,
    Trend,
}

impl DetectionFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionFamily::Statistical => "statistical",
            DetectionFamily::Pattern => "pattern",
            DetectionFamily::Trend => "trend",
        }
    }
}

impl std::fmt::Display for DetectionFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drift alert emitted when a family's confidence crosses the threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftAlert {
    pub id: Uuid,
    pub severity: DriftSeverity,
    pub drift_type: DriftType,
    /// Families whose confidence crossed the threshold
    pub affected_metrics: BTreeSet<DetectionFamily>,
    pub confidence: f64,
    pub timestamp_ns: u64,
    pub raised_at: DateTime<Utc>,
    pub description: String,
    pub recommendations: Vec<String>,
}
