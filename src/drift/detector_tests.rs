//! Unit tests for the Drift Detector

use super::*;
use crate::core::{DriftConfig, QualityMetrics, MAX_DRIFT_THRESHOLD, MIN_DRIFT_THRESHOLD};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Metrics where only the quality score varies
fn metrics_with_score(score: f64, timestamp_ns: u64) -> QualityMetrics {
    QualityMetrics {
        mean_magnitude: 1.0,
        std_magnitude: 0.1,
        mean_dimensionality_usage: 0.8,
        inter_vector_similarity: 0.2,
        distribution_entropy: 3.0,
        quality_score: score,
        sample_size: 1000,
        timestamp_ns,
    }
}

/// Deterministic jitter in [-0.5, 0.5)
fn jitter(i: u64) -> f64 {
    ((i * 7919 + 13) % 1000) as f64 / 1000.0 - 0.5
}

/// Alerts raised over `cycles` scores drawn uniformly from `center ± amplitude`
fn alerts_on_stationary_noise(seed: u64, center: f64, amplitude: f64, cycles: u64) -> u64 {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut detector = DriftDetector::new(DriftConfig::default());
    let mut alerts = 0;
    for i in 0..cycles {
        let score = center + rng.gen_range(-amplitude..amplitude);
        if detector.detect_drift(&metrics_with_score(score, i)).is_some() {
            alerts += 1;
        }
    }
    alerts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warm_up_never_alerts() {
        let mut detector = DriftDetector::new(DriftConfig::default());

        for i in 0..49u64 {
            let extreme = if i % 2 == 0 { 0.0 } else { 1.0 };
            let mut metrics = metrics_with_score(extreme, i);
            metrics.mean_magnitude = 1e12 * extreme;
            assert!(detector.detect_drift(&metrics).is_none());
        }

        assert_eq!(detector.history_len(), 49);
        assert!(!detector.is_warmed_up());
        assert!(detector.recent_alerts(10).is_empty());
    }

    #[test]
    fn test_sudden_quality_drop_raises_alert() {
        let mut detector = DriftDetector::new(DriftConfig::default());
        for i in 0..60u64 {
            assert!(detector.detect_drift(&metrics_with_score(0.9, i)).is_none());
        }

        let alert = detector
            .detect_drift(&metrics_with_score(0.2, 60))
            .expect("quality drop should be detected");

        assert!(matches!(
            alert.severity,
            DriftSeverity::Critical | DriftSeverity::High
        ));
        assert!(matches!(
            alert.drift_type,
            DriftType::Outlier | DriftType::Sudden
        ));
        assert!(alert.affected_metrics.contains(&DetectionFamily::Statistical));
        assert!(!alert.recommendations.is_empty());
        assert_eq!(alert.timestamp_ns, 60);
    }

    #[test]
    fn test_constant_stream_does_not_alert() {
        let mut detector = DriftDetector::new(DriftConfig::default());
        for i in 0..200u64 {
            assert!(detector.detect_drift(&metrics_with_score(0.75, i)).is_none());
        }
        assert_eq!(detector.detection_statistics()["total_detections"], 0.0);
    }

    #[test]
    fn test_tiny_deviation_from_constant_history_is_ignored() {
        let mut detector = DriftDetector::new(DriftConfig::default());
        for i in 0..60u64 {
            detector.detect_drift(&metrics_with_score(0.9, i));
        }

        let blip = metrics_with_score(0.9 + 1e-9, 60);
        let families = detector.evaluate_families(&blip);
        assert_eq!(families.statistical, 0.0);
        assert_eq!(families.max(), 0.0);
        assert!(detector.detect_drift(&blip).is_none());
    }

    #[test]
    fn test_deviation_below_spread_floor_is_ignored() {
        let mut detector = DriftDetector::new(DriftConfig::default());
        for i in 0..80u64 {
            detector.detect_drift(&metrics_with_score(0.5 + 1e-6 * jitter(i), i));
        }

        // far outside the history's own spread, but well under the floor
        let step = metrics_with_score(0.5 + 1e-4, 80);
        assert_eq!(detector.evaluate_families(&step).max(), 0.0);
        assert!(detector.detect_drift(&step).is_none());
    }

    #[test]
    fn test_noisy_stationary_stream_rarely_alerts() {
        for seed in [3, 11, 29] {
            let alerts = alerts_on_stationary_noise(seed, 0.5, 0.01, 2000);
            assert!(alerts < 40, "seed {}: {} alerts in 2000 cycles", seed, alerts);
        }

        let alerts = alerts_on_stationary_noise(5, 0.5, 0.05, 2000);
        assert!(alerts < 100, "{} alerts in 2000 cycles", alerts);
    }

    #[test]
    fn test_history_is_bounded_by_window() {
        let mut detector = DriftDetector::new(DriftConfig::default());
        for i in 0..500u64 {
            detector.detect_drift(&metrics_with_score(0.5 + 0.1 * jitter(i), i));
        }
        assert_eq!(detector.history_len(), 100);
    }

    #[test]
    fn test_alert_ring_is_bounded() {
        let config = DriftConfig {
            min_samples: 10,
            alert_capacity: 5,
            ..DriftConfig::default()
        };
        let mut detector = DriftDetector::new(config);
        for i in 0..10u64 {
            detector.detect_drift(&metrics_with_score(0.9, i));
        }

        // every step sits far below the recent scores
        let mut alerts = 0;
        for i in 0..40u64 {
            let score = 0.85 - 0.02 * i as f64;
            if detector.detect_drift(&metrics_with_score(score, 10 + i)).is_some() {
                alerts += 1;
            }
        }

        assert!(alerts > 5);
        assert_eq!(detector.recent_alerts(100).len(), 5);
    }

    #[test]
    fn test_recent_alerts_newest_first() {
        let config = DriftConfig {
            min_samples: 10,
            ..DriftConfig::default()
        };
        let mut detector = DriftDetector::new(config);
        for i in 0..10u64 {
            detector.detect_drift(&metrics_with_score(0.9, i));
        }
        for i in 0..5u64 {
            detector.detect_drift(&metrics_with_score(0.5 - 0.05 * i as f64, 100 + i));
        }

        let alerts = detector.recent_alerts(3);
        assert_eq!(alerts.len(), 3);
        assert!(alerts[0].timestamp_ns > alerts[1].timestamp_ns);
        assert!(alerts[1].timestamp_ns > alerts[2].timestamp_ns);
    }

    #[test]
    fn test_linear_decline_is_gradual() {
        let mut detector = DriftDetector::new(DriftConfig::default());
        for i in 0..50u64 {
            detector.detect_drift(&metrics_with_score(0.9, i));
        }

        let mut last_alert = None;
        for step in 1..=20u64 {
            let score = 0.9 - 0.02 * step as f64;
            if let Some(alert) = detector.detect_drift(&metrics_with_score(score, 50 + step)) {
                last_alert = Some(alert);
            }
        }

        let alert = last_alert.expect("steady decline should be detected");
        assert_eq!(alert.drift_type, DriftType::Gradual);
        assert!(alert.affected_metrics.contains(&DetectionFamily::Trend));
    }

    #[test]
    fn test_alert_confidence_is_max_family_confidence() {
        let mut detector = DriftDetector::new(DriftConfig::default());
        for i in 0..70u64 {
            detector.detect_drift(&metrics_with_score(0.6 + 0.05 * jitter(i), i));
        }

        let current = metrics_with_score(0.1, 70);
        let families = detector.evaluate_families(&current);
        let alert = detector.detect_drift(&current).expect("drop should be detected");

        assert_eq!(alert.confidence, families.max());
        assert_eq!(
            alert.severity,
            DriftSeverity::from_confidence(alert.confidence, &detector.config().severity_bands)
        );
    }

    #[test]
    fn test_families_need_history() {
        let config = DriftConfig {
            min_samples: 5,
            ..DriftConfig::default()
        };
        let mut detector = DriftDetector::new(config);
        for i in 0..10u64 {
            detector.detect_drift(&metrics_with_score(0.5 + 0.1 * jitter(i), i));
        }

        let families = detector.evaluate_families(&metrics_with_score(0.0, 10));
        assert_eq!(families.pattern, 0.0);
        assert_eq!(families.trend, 0.0);
    }

    #[test]
    fn test_threshold_stays_clamped() {
        let mut detector = DriftDetector::new(DriftConfig {
            min_samples: 5,
            ..DriftConfig::default()
        });
        for i in 0..1000u64 {
            let score = (0.5 + jitter(i) * if i % 50 < 10 { 1.8 } else { 0.1 }).clamp(0.0, 1.0);
            detector.detect_drift(&metrics_with_score(score, i));
            let threshold = detector.threshold();
            assert!((MIN_DRIFT_THRESHOLD..=MAX_DRIFT_THRESHOLD).contains(&threshold));
        }
    }

    #[test]
    fn test_detection_statistics_keys() {
        let mut detector = DriftDetector::new(DriftConfig::default());
        detector.detect_drift(&metrics_with_score(0.5, 0));

        let stats = detector.detection_statistics();
        for key in [
            "total_checks",
            "total_detections",
            "detection_rate",
            "current_threshold",
            "base_threshold",
            "history_size",
            "min_samples",
            "recent_alerts",
            "warmed_up",
            "last_confidence",
        ] {
            assert!(stats.contains_key(key), "missing key {}", key);
        }
        assert_eq!(stats["total_checks"], 1.0);
        assert_eq!(stats["warmed_up"], 0.0);
    }

    #[test]
    fn test_reset_returns_to_warm_up() {
        let mut detector = DriftDetector::new(DriftConfig::default());
        for i in 0..60u64 {
            detector.detect_drift(&metrics_with_score(0.9, i));
        }
        detector.detect_drift(&metrics_with_score(0.1, 60));

        detector.reset();
        assert_eq!(detector.history_len(), 0);
        assert!(detector.recent_alerts(10).is_empty());
        assert_eq!(detector.threshold(), 0.15);
        assert!(detector.detect_drift(&metrics_with_score(0.0, 61)).is_none());
    }
}
