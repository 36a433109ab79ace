// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Performance monitoring with adaptive sampling

pub mod exporter;
pub mod monitor;
pub mod sampling;

#[cfg(test)]
pub mod monitor_tests;

pub use exporter::render_prometheus;
pub use monitor::{PerformanceMetrics, PerformanceMonitor, SharedPerformanceMonitor, TrackingHandle};
pub use sampling::AdaptiveSampling;
