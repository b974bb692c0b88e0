//! Metrics service for verification outcomes

use std::time::Instant;

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};

use crate::shared::error::{AppError, AppResult};

/// Outcome label recorded for successful verifications
pub const OUTCOME_GRANTED: &str = "granted";

/// Prometheus-backed metrics service
pub struct MetricsService {
    registry: Registry,
    outcomes: IntCounterVec,
    duration: Histogram,
    start_time: Instant,
}

impl MetricsService {
    /// Create a new metrics service with its own registry
    pub fn new() -> AppResult<Self> {
        let registry = Registry::new();

        let outcomes = IntCounterVec::new(
            Opts::new("verification_outcomes_total", "Payment verification outcomes by result"),
            &["outcome"],
        )
        .map_err(metrics_error)?;

        let duration = Histogram::with_opts(
            HistogramOpts::new(
                "verification_duration_seconds",
                "Time spent verifying a payment claim",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )
        .map_err(metrics_error)?;

        registry.register(Box::new(outcomes.clone())).map_err(metrics_error)?;
        registry.register(Box::new(duration.clone())).map_err(metrics_error)?;

        Ok(Self { registry, outcomes, duration, start_time: Instant::now() })
    }

    /// Record one verification: `granted` or the rejection's error type
    pub fn record_outcome(&self, outcome: &str, elapsed_seconds: f64) {
        self.outcomes.with_label_values(&[outcome]).inc();
        self.duration.observe(elapsed_seconds);
    }

    pub fn outcome_count(&self, outcome: &str) -> u64 {
        self.outcomes.with_label_values(&[outcome]).get()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Prometheus text exposition
    pub fn render(&self) -> AppResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metrics_error)?;
        String::from_utf8(buffer).map_err(|e| AppError::Internal(format!("metrics encoding: {}", e)))
    }
}

fn metrics_error(err: prometheus::Error) -> AppError {
    AppError::Internal(format!("metrics: {}", err))
}
