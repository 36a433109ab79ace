// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Adaptive index management
//!
//! Turns quality, drift and performance signals into prioritized,
//! budget-filtered index optimization strategies and executes them
//! through a host-provided [`IndexOptimizer`].

pub mod history;
pub mod manager;
pub mod optimizer;
pub mod strategy;


pub use history::{AdaptationHistory, AdaptationRecord};
pub use manager::{
    is_internal_operation, AdaptiveIndexManager, SharedAdaptiveIndexManager,
    DRIFT_DETECTION_OPERATION, QUALITY_METRICS_OPERATION,
};
pub use optimizer::IndexOptimizer;
pub use strategy::{IndexOptimizationStrategy, StrategyKind, STRATEGY_OPERATION_PREFIX};
