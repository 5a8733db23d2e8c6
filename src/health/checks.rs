// src/health/checks.rs
use super::status::{CheckFlags, HealthCheckResult};
use crate::logging::describe_panic;
use anyhow::Result;
use async_trait::async_trait;
use futures::FutureExt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn};
use url::Url;

pub const ENVIRONMENT_FAILED: &str = "Environment validation failed";
pub const DEPENDENCY_FAILED: &str = "Dependency initialization failed";
pub const DEPENDENCY_UNAVAILABLE: &str = "Dependency unavailable";
pub const NETWORK_OFFLINE: &str = "No network connection";
pub const NETWORK_FAILED: &str = "Network check failed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl EnvironmentReport {
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Handle to a critical external dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyHandle {
    pub name: String,
    pub endpoint: Option<Url>,
}

pub trait EnvironmentValidator: Send + Sync {
    fn validate(&self) -> Result<EnvironmentReport>;
}

#[async_trait]
pub trait DependencyResolver: Send + Sync {
    /// `Ok(None)` means the dependency is not available.
    async fn resolve(&self) -> Result<Option<DependencyHandle>>;
}

#[async_trait]
pub trait NetworkProbe: Send + Sync {
    async fn is_online(&self) -> Result<bool>;
}

struct CheckOutcome {
    ok: bool,
    errors: Vec<String>,
}

impl CheckOutcome {
    fn pass() -> Self {
        Self {
            ok: true,
            errors: Vec::new(),
        }
    }

    fn fail(errors: Vec<String>) -> Self {
        Self { ok: false, errors }
    }

    fn fail_with(message: &str) -> Self {
        Self::fail(vec![message.to_string()])
    }
}

/// The three collaborators behind an aggregate health check.
#[derive(Clone)]
pub struct HealthProbes {
    validator: Arc<dyn EnvironmentValidator>,
    resolver: Arc<dyn DependencyResolver>,
    network: Arc<dyn NetworkProbe>,
}

impl HealthProbes {
    pub fn new(
        validator: Arc<dyn EnvironmentValidator>,
        resolver: Arc<dyn DependencyResolver>,
        network: Arc<dyn NetworkProbe>,
    ) -> Self {
        Self {
            validator,
            resolver,
            network,
        }
    }

    /// Run all checks concurrently. A failing or panicking check only marks
    /// its own flag false.
    pub async fn run_health_check(&self) -> HealthCheckResult {
        let (environment, dependency, network) = tokio::join!(
            async { self.check_environment() },
            self.check_dependency(),
            self.check_network(),
        );

        let checks = CheckFlags {
            environment: environment.ok,
            dependency: dependency.ok,
            network: network.ok,
        };

        let errors = [environment, dependency, network]
            .into_iter()
            .flat_map(|outcome| outcome.errors)
            .collect();

        HealthCheckResult::new(checks, errors)
    }

    fn check_environment(&self) -> CheckOutcome {
        match panic::catch_unwind(AssertUnwindSafe(|| self.validator.validate())) {
            Ok(Ok(report)) if report.valid => CheckOutcome::pass(),
            Ok(Ok(report)) => {
                debug!(errors = ?report.errors, "Environment configuration incomplete");
                CheckOutcome::fail(report.errors)
            }
            Ok(Err(e)) => {
                error!(error = %e, "Environment check failed");
                CheckOutcome::fail_with(ENVIRONMENT_FAILED)
            }
            Err(payload) => {
                error!(panic = %describe_panic(payload.as_ref()), "Environment check panicked");
                CheckOutcome::fail_with(ENVIRONMENT_FAILED)
            }
        }
    }

    async fn check_dependency(&self) -> CheckOutcome {
        match AssertUnwindSafe(self.resolver.resolve()).catch_unwind().await {
            Ok(Ok(Some(handle))) => {
                debug!(dependency = %handle.name, "Dependency resolved");
                CheckOutcome::pass()
            }
            Ok(Ok(None)) => {
                warn!("Dependency handle unavailable");
                CheckOutcome::fail_with(DEPENDENCY_UNAVAILABLE)
            }
            Ok(Err(e)) => {
                error!(error = %e, "Dependency check failed");
                CheckOutcome::fail_with(DEPENDENCY_FAILED)
            }
            Err(payload) => {
                error!(panic = %describe_panic(payload.as_ref()), "Dependency check panicked");
                CheckOutcome::fail_with(DEPENDENCY_FAILED)
            }
        }
    }

    async fn check_network(&self) -> CheckOutcome {
        match AssertUnwindSafe(self.network.is_online()).catch_unwind().await {
            Ok(Ok(true)) => CheckOutcome::pass(),
            Ok(Ok(false)) => CheckOutcome::fail_with(NETWORK_OFFLINE),
            Ok(Err(e)) => {
                error!(error = %e, "Network check failed");
                CheckOutcome::fail_with(NETWORK_FAILED)
            }
            Err(payload) => {
                error!(panic = %describe_panic(payload.as_ref()), "Network check panicked");
                CheckOutcome::fail_with(NETWORK_FAILED)
            }
        }
    }
}
