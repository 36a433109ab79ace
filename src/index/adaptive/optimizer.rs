// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Host-side index operations invoked by executed strategies

use anyhow::Result;
use async_trait::async_trait;

use super::IndexOptimizationStrategy;

/// Index component that carries out adaptations
///
/// Each handler receives the full strategy so it can read its parameters.
#[async_trait]
pub trait IndexOptimizer: Send + Sync {
    async fn full_reindex(&self, strategy: &IndexOptimizationStrategy) -> Result<()>;

    async fn partial_reindex(&self, strategy: &IndexOptimizationStrategy) -> Result<()>;

    async fn tune_parameters(&self, strategy: &IndexOptimizationStrategy) -> Result<()>;

    async fn prune(&self, strategy: &IndexOptimizationStrategy) -> Result<()>;

    async fn expand(&self, strategy: &IndexOptimizationStrategy) -> Result<()>;

    /// Current search performance score, higher is better
    async fn performance_score(&self) -> f64 {
        0.0
    }
}
