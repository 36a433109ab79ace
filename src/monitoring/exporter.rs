// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Prometheus text exposition of monitor and detector snapshots

use prometheus::{Encoder, Gauge, Opts, Registry, TextEncoder};
use std::collections::BTreeMap;

use crate::core::{Result, SentinelError};

pub const METRIC_NAMESPACE: &str = "proxima_sentinel";

/// Render a performance summary and drift statistics as Prometheus text
///
/// Each key becomes a gauge named `proxima_sentinel_<subsystem>_<key>`.
/// A private registry is used so repeated renders never collide.
pub fn render_prometheus(
    performance: &BTreeMap<String, f64>,
    drift: &BTreeMap<String, f64>,
) -> Result<String> {
    let registry = Registry::new();
    register_snapshot(&registry, "performance", performance)?;
    register_snapshot(&registry, "drift", drift)?;

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| SentinelError::Export(e.to_string()))
}

fn register_snapshot(
    registry: &Registry,
    subsystem: &str,
    snapshot: &BTreeMap<String, f64>,
) -> Result<()> {
    for (key, value) in snapshot {
        let help = format!("{} {}", subsystem, key.replace('_', " "));
        let opts = Opts::new(sanitize(key), help)
            .namespace(METRIC_NAMESPACE)
            .subsystem(subsystem);
        let gauge = Gauge::with_opts(opts)?;
        gauge.set(*value);
        registry.register(Box::new(gauge))?;
    }
    Ok(())
}

fn sanitize(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
