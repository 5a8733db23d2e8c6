// src/metrics/collector.rs
use crate::health::HealthCheckResult;
use crate::leave::LeaveStep;
use anyhow::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

pub struct MetricsCollector {
    // Expiration metrics
    pub expiration_runs_total: IntCounterVec,
    pub expiration_step_failures_total: IntCounterVec,
    pub expiration_run_duration_seconds: Histogram,

    // Health metrics
    pub health_checks_total: IntCounterVec,
    pub health_check_up: IntGaugeVec,
    pub health_status: IntGauge,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        // Expiration metrics
        let expiration_runs_total = IntCounterVec::new(
            Opts::new(
                "leave_expiration_runs_total",
                "Leave expiration runs by trigger and outcome",
            ),
            &["trigger", "outcome"],
        )?;
        registry.register(Box::new(expiration_runs_total.clone()))?;

        let expiration_step_failures_total = IntCounterVec::new(
            Opts::new(
                "leave_expiration_step_failures_total",
                "Failed leave expiration steps",
            ),
            &["step"],
        )?;
        registry.register(Box::new(expiration_step_failures_total.clone()))?;

        let expiration_run_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "leave_expiration_run_duration_seconds",
            "Leave expiration run duration in seconds",
        ))?;
        registry.register(Box::new(expiration_run_duration_seconds.clone()))?;

        // Health metrics
        let health_checks_total = IntCounterVec::new(
            Opts::new("health_checks_total", "Health checks by resulting status"),
            &["status"],
        )?;
        registry.register(Box::new(health_checks_total.clone()))?;

        let health_check_up = IntGaugeVec::new(
            Opts::new(
                "health_check_up",
                "Individual check result (1=passing, 0=failing)",
            ),
            &["check"],
        )?;
        registry.register(Box::new(health_check_up.clone()))?;

        let health_status = IntGauge::new(
            "health_status",
            "Aggregate health (2=healthy, 1=degraded, 0=unhealthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        Ok(Self {
            expiration_runs_total,
            expiration_step_failures_total,
            expiration_run_duration_seconds,
            health_checks_total,
            health_check_up,
            health_status,
        })
    }

    pub fn record_expiration_run(&self, trigger: &str, failed_steps: &[LeaveStep], duration: Duration) {
        let outcome = if failed_steps.is_empty() {
            "completed"
        } else {
            "partial"
        };
        self.expiration_runs_total
            .with_label_values(&[trigger, outcome])
            .inc();

        for step in failed_steps {
            self.expiration_step_failures_total
                .with_label_values(&[step.as_str()])
                .inc();
        }

        self.expiration_run_duration_seconds
            .observe(duration.as_secs_f64());
    }

    pub fn record_expiration_skipped(&self, trigger: &str) {
        self.expiration_runs_total
            .with_label_values(&[trigger, "skipped"])
            .inc();
    }

    pub fn record_health_check(&self, result: &HealthCheckResult) {
        self.health_checks_total
            .with_label_values(&[result.status.as_str()])
            .inc();

        for (check, up) in result.checks.iter() {
            self.health_check_up
                .with_label_values(&[check])
                .set(if up { 1 } else { 0 });
        }

        self.health_status.set(result.status.score());
    }
}

// Helper for timing operations
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
