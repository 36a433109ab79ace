// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Quality Metrics Engine - sampled statistical health of a vector collection
//!
//! Metrics are computed from an evenly strided sample so that cost depends on
//! the sample size only, never on the collection size, and two computations
//! over the same collection yield identical values.

pub mod engine;
pub mod recommendations;


pub use engine::{strided_indices, QualityMetricsEngine, SubScores};
