/*
 * Copyright 2025 Vijaykumar Singh
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! # Proxima Sentinel - Vector Quality Observability
//!
//! Continuous quality monitoring and adaptive index control for vector
//! collections.
//!
//! ## Components
//!
//! - **Quality Metrics Engine**: sampled statistics over a collection and a
//!   composite quality score
//! - **Drift Detector**: statistical, pattern and trend detection families over
//!   a rolling metrics history with an adaptive threshold
//! - **Performance Monitor**: sampled operation tracking whose sampling rate
//!   backs off to keep its own overhead under target
//! - **Adaptive Index Manager**: turns the three signals into prioritized,
//!   budget-filtered index optimization strategies under a cooldown
//!
//! Every component is an explicitly owned, single-threaded instance per
//! collection. Hosts sharing one across threads wrap it in a mutex
//! ([`SharedPerformanceMonitor`], [`SharedAdaptiveIndexManager`]).

pub mod core;
pub mod drift;
pub mod index;
pub mod monitoring;
pub mod quality;

pub use crate::core::{
    Clock, ConfigError, ManualClock, QualityMetrics, Result, SentinelConfig, SentinelError,
    SystemClock, VectorSource,
};
pub use drift::{DriftAlert, DriftDetector, DriftSeverity, DriftType};
pub use index::{
    AdaptiveIndexManager, IndexOptimizationStrategy, IndexOptimizer, SharedAdaptiveIndexManager,
    StrategyKind,
};
pub use monitoring::{PerformanceMonitor, SharedPerformanceMonitor, TrackingHandle};
pub use quality::QualityMetricsEngine;
