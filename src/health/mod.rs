// src/health/mod.rs
mod checks;
mod monitor;
mod probes;
mod status;

pub use checks::{
    DependencyHandle, DependencyResolver, EnvironmentReport, EnvironmentValidator, HealthProbes,
    NetworkProbe, DEPENDENCY_FAILED, DEPENDENCY_UNAVAILABLE, ENVIRONMENT_FAILED, NETWORK_FAILED,
    NETWORK_OFFLINE,
};
pub use monitor::{HealthMonitor, Listener, Subscription};
pub use probes::{AuthDomainResolver, TcpNetworkProbe};
pub use status::{aggregate_status, CheckFlags, HealthCheckResult, HealthStatus};
