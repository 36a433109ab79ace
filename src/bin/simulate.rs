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

//! Proxima Sentinel simulator - drives the control loop over a synthetic collection

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use proxima_sentinel::monitoring::render_prometheus;
use proxima_sentinel::{
    AdaptiveIndexManager, Clock, IndexOptimizationStrategy, IndexOptimizer, ManualClock,
    SentinelConfig, StrategyKind, SystemClock,
};

#[derive(Parser)]
#[command(name = "proxima-sentinel-simulate")]
#[command(about = "Run the vector quality control loop against a synthetic collection")]
struct Args {
    /// TOML configuration file; defaults are used when absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Evaluation cycles to run
    #[arg(long, default_value_t = 120)]
    cycles: usize,

    /// Cycle at which the collection starts to degrade
    #[arg(long, default_value_t = 80)]
    drift_at: usize,

    /// Initial number of vectors
    #[arg(long, default_value_t = 5_000)]
    collection_size: usize,

    /// Vectors added per cycle
    #[arg(long, default_value_t = 50)]
    growth_per_cycle: usize,

    #[arg(long, default_value_t = 64)]
    dimension: usize,

    /// Simulated seconds between cycles
    #[arg(long, default_value_t = 60)]
    interval_secs: u64,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Also print the Prometheus exposition
    #[arg(long)]
    prometheus: bool,
}

/// Wall-clock time plus a manually advanced offset
struct SimulationClock {
    real: SystemClock,
    offset: ManualClock,
}

impl Clock for SimulationClock {
    fn now_nanos(&self) -> u64 {
        self.real.now_nanos().saturating_add(self.offset.now_nanos())
    }
}

/// Index stand-in whose score responds to executed strategies
#[derive(Default)]
struct SimulatedIndex {
    score: Mutex<f64>,
}

impl SimulatedIndex {
    fn apply(&self, strategy: &IndexOptimizationStrategy) -> Result<()> {
        let mut score = self.score.lock();
        *score += strategy.estimated_impact * 0.1;
        info!(
            "Simulated {} ({}), index score now {:.3}",
            strategy.kind, strategy.description, *score
        );
        Ok(())
    }
}

#[async_trait]
impl IndexOptimizer for SimulatedIndex {
    async fn full_reindex(&self, strategy: &IndexOptimizationStrategy) -> Result<()> {
        self.apply(strategy)
    }

    async fn partial_reindex(&self, strategy: &IndexOptimizationStrategy) -> Result<()> {
        self.apply(strategy)
    }

    async fn tune_parameters(&self, strategy: &IndexOptimizationStrategy) -> Result<()> {
        self.apply(strategy)
    }

    async fn prune(&self, strategy: &IndexOptimizationStrategy) -> Result<()> {
        self.apply(strategy)
    }

    async fn expand(&self, strategy: &IndexOptimizationStrategy) -> Result<()> {
        self.apply(strategy)
    }

    async fn performance_score(&self) -> f64 {
        *self.score.lock()
    }
}

#[derive(Serialize)]
struct CycleReport {
    cycle: usize,
    collection_len: usize,
    quality_score: f64,
    alerts: usize,
    selected: Vec<StrategyKind>,
    executed: Option<StrategyKind>,
    success: Option<bool>,
}

#[derive(Serialize)]
struct SimulationReport {
    cycles: Vec<CycleReport>,
    adaptations: usize,
    performance: BTreeMap<String, f64>,
    drift: BTreeMap<String, f64>,
}

/// Healthy vectors fill every dimension; degraded ones collapse onto a
/// shared sparse centroid
fn generate_collection(
    rng: &mut StdRng,
    len: usize,
    dimension: usize,
    degradation: f64,
) -> Vec<Vec<f32>> {
    let active = ((dimension as f64 * (1.0 - 0.8 * degradation)).ceil() as usize).clamp(1, dimension);
    let centroid: Vec<f32> = (0..dimension).map(|d| if d < active { 0.5 } else { 0.0 }).collect();

    (0..len)
        .map(|_| {
            (0..dimension)
                .map(|d| {
                    if d >= active {
                        return 0.0;
                    }
                    let noise: f32 = rng.gen_range(-1.0..1.0);
                    let spread = (1.0 - 0.95 * degradation) as f32;
                    centroid[d] * degradation as f32 + noise * spread
                })
                .collect()
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SentinelConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => {
            info!("No configuration file given, using defaults");
            SentinelConfig::default()
        }
    };

    let offset = ManualClock::new();
    let clock = Arc::new(SimulationClock {
        real: SystemClock::new(),
        offset: offset.clone(),
    });
    let index = Arc::new(SimulatedIndex::default());
    let mut manager = AdaptiveIndexManager::with_clock(config, index, clock);
    let mut rng = StdRng::seed_from_u64(args.seed);

    info!(
        "Simulating {} cycles, drift from cycle {}, {} x {} vectors",
        args.cycles, args.drift_at, args.collection_size, args.dimension
    );

    let mut cycles = Vec::with_capacity(args.cycles);
    for cycle in 0..args.cycles {
        let degradation = if cycle < args.drift_at {
            0.0
        } else {
            ((cycle - args.drift_at + 1) as f64 / 10.0).min(1.0)
        };
        let len = args.collection_size + cycle * args.growth_per_cycle;
        let vectors = generate_collection(&mut rng, len, args.dimension, degradation);

        let alerts_before = manager.detection_statistics()["total_detections"];
        let selected = manager.evaluate_adaptation_needs(&vectors);
        let alerts = (manager.detection_statistics()["total_detections"] - alerts_before) as usize;

        let (executed, success) = match selected.first() {
            Some(strategy) => {
                let success = manager.execute_strategy(strategy).await;
                if !success {
                    warn!("Cycle {}: {} failed", cycle, strategy.kind);
                }
                (Some(strategy.kind), Some(success))
            }
            None => (None, None),
        };

        cycles.push(CycleReport {
            cycle,
            collection_len: len,
            quality_score: manager.last_metrics().map(|m| m.quality_score).unwrap_or(0.0),
            alerts,
            selected: selected.iter().map(|s| s.kind).collect(),
            executed,
            success,
        });

        offset.advance(Duration::from_secs(args.interval_secs));
    }

    let report = SimulationReport {
        cycles,
        adaptations: manager.history().len(),
        performance: manager.performance_summary(),
        drift: manager.detection_statistics(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    if args.prometheus {
        let exposition = render_prometheus(&report.performance, &report.drift)?;
        println!("{}", exposition);
    }

    Ok(())
}
