// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Index optimization strategies

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Prefix of the operation types strategy executions are timed under
pub const STRATEGY_OPERATION_PREFIX: &str = "strategy.";

/// Kinds of index adaptation the control loop can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StrategyKind {
    /// Rebuild the whole index
    FullReindex,

    /// Rebuild the recently changed part of the index
    PartialReindex,

    /// Retune search and build parameters
    ParameterTuning,

    /// Remove redundant vectors or graph edges
    Pruning,

    /// Grow index capacity for a larger collection
    Expansion,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::FullReindex,
        StrategyKind::PartialReindex,
        StrategyKind::ParameterTuning,
        StrategyKind::Pruning,
        StrategyKind::Expansion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::FullReindex => "full_reindex",
            StrategyKind::PartialReindex => "partial_reindex",
            StrategyKind::ParameterTuning => "parameter_tuning",
            StrategyKind::Pruning => "pruning",
            StrategyKind::Expansion => "expansion",
        }
    }

    /// Operation type under which executions are timed
    pub fn operation_type(&self) -> String {
        format!("{}{}", STRATEGY_OPERATION_PREFIX, self.as_str())
    }

    /// Whether executing this kind resets the capacity baseline
    pub fn rebuilds_index(&self) -> bool {
        matches!(
            self,
            StrategyKind::FullReindex | StrategyKind::PartialReindex | StrategyKind::Expansion
        )
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One candidate adaptation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexOptimizationStrategy {
    pub kind: StrategyKind,

    /// 1 is most urgent
    pub priority: u8,

    /// Expected relative improvement in [0, 1]
    pub estimated_impact: f64,

    /// Fraction of the resource budget consumed
    pub resource_cost: f64,

    pub description: String,

    /// Handler parameters
    pub parameters: BTreeMap<String, f64>,
}

impl IndexOptimizationStrategy {
    pub fn new(kind: StrategyKind, priority: u8, estimated_impact: f64, resource_cost: f64) -> Self {
        Self {
            kind,
            priority,
            estimated_impact: estimated_impact.clamp(0.0, 1.0),
            resource_cost,
            description: String::new(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_parameter(mut self, name: &str, value: f64) -> Self {
        self.parameters.insert(name.to_string(), value);
        self
    }

    pub fn parameter(&self, name: &str) -> Option<f64> {
        self.parameters.get(name).copied()
    }
}
