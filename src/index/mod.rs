// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Index-facing side of the control loop

pub mod adaptive;

pub use adaptive::{
    AdaptationHistory, AdaptationRecord, AdaptiveIndexManager, IndexOptimizationStrategy,
    IndexOptimizer, SharedAdaptiveIndexManager, StrategyKind,
};
