// src/health/status.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }

    /// Gauge value: 2 healthy, 1 degraded, 0 unhealthy.
    pub fn score(&self) -> i64 {
        match self {
            HealthStatus::Healthy => 2,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 0,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of each individual check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckFlags {
    pub environment: bool,
    pub dependency: bool,
    pub network: bool,
}

impl CheckFlags {
    pub fn passed(&self) -> usize {
        [self.environment, self.dependency, self.network]
            .iter()
            .filter(|ok| **ok)
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, bool)> {
        [
            ("environment", self.environment),
            ("dependency", self.dependency),
            ("network", self.network),
        ]
        .into_iter()
    }
}

/// All three checks passing is healthy, two is degraded, anything less is unhealthy.
pub fn aggregate_status(environment: bool, dependency: bool, network: bool) -> HealthStatus {
    let flags = CheckFlags {
        environment,
        dependency,
        network,
    };

    match flags.passed() {
        3 => HealthStatus::Healthy,
        2 => HealthStatus::Degraded,
        _ => HealthStatus::Unhealthy,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub checks: CheckFlags,
    pub errors: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl HealthCheckResult {
    pub fn new(checks: CheckFlags, errors: Vec<String>) -> Self {
        Self {
            status: aggregate_status(checks.environment, checks.dependency, checks.network),
            checks,
            errors,
            timestamp: Utc::now(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_status_all_combinations() {
        use HealthStatus::*;

        let table = [
            ((true, true, true), Healthy),
            ((true, true, false), Degraded),
            ((true, false, true), Degraded),
            ((false, true, true), Degraded),
            ((true, false, false), Unhealthy),
            ((false, true, false), Unhealthy),
            ((false, false, true), Unhealthy),
            ((false, false, false), Unhealthy),
        ];

        for ((e, d, n), expected) in table {
            assert_eq!(aggregate_status(e, d, n), expected, "({}, {}, {})", e, d, n);
        }
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let result = HealthCheckResult::new(
            CheckFlags {
                environment: true,
                dependency: true,
                network: true,
            },
            Vec::new(),
        );
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["status"], "healthy");
        assert_eq!(json["checks"]["network"], true);
        assert_eq!(HealthStatus::Degraded.to_string(), "degraded");
    }
}
