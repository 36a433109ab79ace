// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Log of executed adaptations and cooldown tracking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use super::{IndexOptimizationStrategy, StrategyKind};

/// Outcome of one executed strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptationRecord {
    pub id: Uuid,
    pub strategy: IndexOptimizationStrategy,
    pub executed_at_ns: u64,
    pub executed_at: DateTime<Utc>,
    pub success: bool,
    /// Performance score after execution minus score before
    pub performance_delta: f64,
}

/// Bounded adaptation log
#[derive(Debug, Clone)]
pub struct AdaptationHistory {
    records: Vec<AdaptationRecord>,
    capacity: usize,
    retain: usize,
    last_adaptation_ns: Option<u64>,
}

impl AdaptationHistory {
    /// Log that trims to the newest `retain` records once `capacity` is exceeded
    pub fn new(capacity: usize, retain: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Vec::with_capacity(capacity),
            capacity,
            retain: retain.clamp(1, capacity),
            last_adaptation_ns: None,
        }
    }

    pub fn record(
        &mut self,
        strategy: IndexOptimizationStrategy,
        executed_at_ns: u64,
        success: bool,
        performance_delta: f64,
    ) -> &AdaptationRecord {
        self.last_adaptation_ns = Some(executed_at_ns);
        self.records.push(AdaptationRecord {
            id: Uuid::new_v4(),
            strategy,
            executed_at_ns,
            executed_at: Utc::now(),
            success,
            performance_delta,
        });

        if self.records.len() > self.capacity {
            let excess = self.records.len() - self.retain;
            self.records.drain(..excess);
        }

        &self.records[self.records.len() - 1]
    }

    pub fn records(&self) -> &[AdaptationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last_adaptation_ns(&self) -> Option<u64> {
        self.last_adaptation_ns
    }

    /// Success rate of retained executions of `kind`, if any
    pub fn success_rate(&self, kind: StrategyKind) -> Option<f64> {
        let (attempts, successes) = self
            .records
            .iter()
            .filter(|r| r.strategy.kind == kind)
            .fold((0usize, 0usize), |(attempts, successes), r| {
                (attempts + 1, successes + usize::from(r.success))
            });

        if attempts == 0 {
            None
        } else {
            Some(successes as f64 / attempts as f64)
        }
    }

    /// Time left before another adaptation may run
    pub fn cooldown_remaining(&self, now_ns: u64, cooldown: Duration) -> Duration {
        match self.last_adaptation_ns {
            Some(last) => {
                let elapsed = now_ns.saturating_sub(last);
                let cooldown_ns = u64::try_from(cooldown.as_nanos()).unwrap_or(u64::MAX);
                Duration::from_nanos(cooldown_ns.saturating_sub(elapsed))
            }
            None => Duration::ZERO,
        }
    }

    pub fn in_cooldown(&self, now_ns: u64, cooldown: Duration) -> bool {
        !self.cooldown_remaining(now_ns, cooldown).is_zero()
    }
}
