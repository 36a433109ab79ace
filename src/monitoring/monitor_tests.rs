//! Unit tests for the Performance Monitor

use super::*;
use crate::core::{ManualClock, MonitoringConfig, MAX_SAMPLING_RATE, MIN_SAMPLING_RATE};
use std::sync::Arc;
use std::time::Duration;

fn seeded_config() -> MonitoringConfig {
    MonitoringConfig {
        seed: Some(42),
        ..MonitoringConfig::default()
    }
}

fn monitor_with_clock() -> (PerformanceMonitor, ManualClock) {
    let clock = ManualClock::new();
    let monitor = PerformanceMonitor::with_clock(seeded_config(), Arc::new(clock.clone()));
    (monitor, clock)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracked_operation_latency() {
        let (mut monitor, clock) = monitor_with_clock();

        let handle = monitor.start_tracking("search");
        assert!(handle.is_tracked());
        clock.advance(Duration::from_micros(50));
        monitor.record_completion(handle, true);

        let recent = monitor.recent_metrics(1);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].operation_latency_ns, 50_000);
        assert_eq!(recent[0].operation_type, "search");
        assert!(recent[0].success);
        assert!((recent[0].throughput_ops_per_sec - 20_000.0).abs() < 1e-6);
        // 100ns cost over 50us at full sampling
        assert!((monitor.overhead_percentage() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_untracked_handle_records_nothing() {
        let (mut monitor, _clock) = monitor_with_clock();
        monitor.record_completion(TrackingHandle::Untracked, false);

        assert!(monitor.recent_metrics(10).is_empty());
        assert_eq!(monitor.performance_summary()["tracked_operations"], 0.0);
    }

    #[test]
    fn test_usage_figures_are_kept() {
        let (mut monitor, clock) = monitor_with_clock();
        let handle = monitor.start_tracking("insert");
        clock.advance(Duration::from_millis(1));
        monitor.record_completion_with_usage(handle, false, 4096, 0.35);

        let sample = &monitor.recent_metrics(1)[0];
        assert_eq!(sample.memory_usage_bytes, 4096);
        assert_eq!(sample.cpu_utilization, 0.35);
        assert!(!sample.success);
    }

    #[test]
    fn test_track_wrapper() {
        let (mut monitor, clock) = monitor_with_clock();
        let value = monitor.track("quality_metrics", || {
            clock.advance(Duration::from_micros(10));
            7
        });

        assert_eq!(value, 7);
        assert_eq!(monitor.operation_types()["quality_metrics"], 1);
        assert_eq!(monitor.recent_metrics(1)[0].operation_latency_ns, 10_000);
    }

    #[test]
    fn test_metrics_ring_is_bounded() {
        let (mut monitor, _clock) = monitor_with_clock();
        for i in 0..2500u64 {
            monitor.record_operation("search", 1_000_000 + i, true);
        }

        let summary = monitor.performance_summary();
        assert!(summary["buffered_metrics"] <= 1000.0);
        assert!(monitor.recent_metrics(5000).len() <= 1000);
    }

    #[test]
    fn test_overhead_converges_to_target() {
        let (mut monitor, _clock) = monitor_with_clock();

        // 100ns cost on 1us operations is 10% at full sampling
        for _ in 0..20_000 {
            monitor.record_operation("search", 1_000, true);
        }

        let rate = monitor.sampling_rate();
        assert!(rate < 0.2, "rate {} did not back off", rate);
        assert!(rate >= MIN_SAMPLING_RATE);
        assert!(monitor.overhead_percentage() <= 1.05);
        assert!(monitor.performance_summary()["skipped_operations"] > 0.0);
    }

    #[test]
    fn test_sampling_rate_stays_clamped() {
        let (mut monitor, _clock) = monitor_with_clock();
        for i in 0..5_000u64 {
            let latency = if i % 1000 < 500 { 1 } else { 10_000_000 };
            monitor.record_operation("mixed", latency, true);
            let rate = monitor.sampling_rate();
            assert!((MIN_SAMPLING_RATE..=MAX_SAMPLING_RATE).contains(&rate));
        }
    }

    #[test]
    fn test_regression_needs_baseline() {
        let (mut monitor, _clock) = monitor_with_clock();
        for _ in 0..10 {
            monitor.record_operation("search", 1_000_000, true);
        }
        assert!(monitor.baseline_latency("search").is_none());
        assert!(!monitor.detect_regression("search", 0.2));
        assert!(!monitor.detect_regression("unknown", 0.2));
    }

    #[test]
    fn test_latency_regression_detected() {
        let (mut monitor, _clock) = monitor_with_clock();
        for _ in 0..30 {
            monitor.record_operation("search", 1_000_000, true);
        }
        assert!(!monitor.detect_regression("search", 0.2));

        for _ in 0..10 {
            monitor.record_operation("search", 2_000_000, true);
        }
        assert!(monitor.detect_regression("search", 0.2));
        assert_eq!(monitor.regressed_operations(), vec!["search".to_string()]);
        assert!(!monitor.detect_regression("search", 1.5));
    }

    #[test]
    fn test_overhead_acceptability() {
        let (mut monitor, _clock) = monitor_with_clock();
        assert!(monitor.is_overhead_acceptable());

        // 100ns cost on 500ns operations
        monitor.record_operation("tiny", 500, true);
        assert!(!monitor.is_overhead_acceptable());
        assert!((monitor.overhead_percentage() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_latency_is_finite() {
        let (mut monitor, _clock) = monitor_with_clock();
        monitor.record_operation("instant", 0, true);
        assert!(monitor.overhead_percentage().is_finite());
        assert!(monitor.recent_metrics(1)[0].throughput_ops_per_sec.is_finite());
    }

    #[test]
    fn test_performance_summary_keys() {
        let (mut monitor, _clock) = monitor_with_clock();
        monitor.record_operation("search", 1_000_000, true);
        monitor.record_operation("insert", 3_000_000, false);

        let summary = monitor.performance_summary();
        for key in [
            "sampling_rate",
            "overhead_percentage",
            "target_overhead_percentage",
            "tracked_operations",
            "skipped_operations",
            "buffered_metrics",
            "operation_types",
            "avg_latency_ns",
            "success_rate",
            "avg_throughput_ops_per_sec",
        ] {
            assert!(summary.contains_key(key), "missing key {}", key);
        }
        assert_eq!(summary["operation_types"], 2.0);
        assert_eq!(summary["avg_latency_ns"], 2_000_000.0);
        assert_eq!(summary["success_rate"], 0.5);
    }

    #[test]
    fn test_shared_monitor_across_threads() {
        let shared = PerformanceMonitor::new(seeded_config()).into_shared();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let monitor = Arc::clone(&shared);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        monitor.lock().record_operation("search", 5_000_000, true);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(shared.lock().operation_types()["search"], 400);
    }
}
