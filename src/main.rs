// src/main.rs
use anyhow::Result;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

use leave_runtime::{
    config::{self, Config},
    health::{AuthDomainResolver, HealthMonitor, HealthProbes, TcpNetworkProbe},
    leave::HttpLeaveService,
    logging,
    metrics::MetricsRegistry,
    scheduler::ExpirationScheduler,
    server::StatusServer,
    timezone::SystemClock,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.yaml"));

    let config = Arc::new(config::load_config(Some(&config_path))?);

    // Initialize tracing
    logging::init(&config)?;
    info!(
        path = %config_path.display(),
        environment = ?config.environment,
        "Configuration loaded"
    );

    // Initialize metrics
    let metrics_registry = Arc::new(MetricsRegistry::new()?);
    let metrics = metrics_registry.collector();

    // Leave expiration scheduler
    let scheduler = if config.scheduler.enabled {
        let service = Arc::new(HttpLeaveService::from_config(&config.leave_service)?);
        let clock = Arc::new(SystemClock::new(config.scheduler.offset()?));
        let scheduler = Arc::new(ExpirationScheduler::new(
            &config.scheduler,
            service,
            clock,
            Some(metrics.clone()),
        ));
        scheduler.start();
        Some(scheduler)
    } else {
        warn!("Leave scheduler disabled by configuration");
        None
    };

    // Health monitor
    let monitor = if config.health.enabled {
        let probes = build_probes(&config)?;
        let monitor = Arc::new(HealthMonitor::new(probes, Some(metrics.clone())));
        monitor.start(config.health.interval());
        Some(monitor)
    } else {
        warn!("Health monitor disabled by configuration");
        None
    };

    // Status server
    let status_server = if config.metrics.enabled {
        let addr: SocketAddr = ([0, 0, 0, 0], config.metrics.port).into();
        let server = StatusServer::new(
            metrics_registry.clone(),
            monitor.clone(),
            config.metrics.path.clone(),
        );
        Some(server.spawn(addr)?.1)
    } else {
        None
    };

    shutdown_signal().await;

    if let Some(scheduler) = &scheduler {
        scheduler.stop();
    }
    if let Some(monitor) = &monitor {
        monitor.stop();
    }
    if let Some(handle) = status_server {
        handle.abort();
    }

    info!("Shutdown complete");
    Ok(())
}

fn build_probes(config: &Arc<Config>) -> Result<HealthProbes> {
    let resolver = AuthDomainResolver::new(
        config.firebase.auth_domain.clone(),
        config.health.probe_timeout(),
    )?;
    let network = TcpNetworkProbe::new(
        config.health.network_probe_addr.clone(),
        config.health.probe_timeout(),
    );

    Ok(HealthProbes::new(
        config.clone(),
        Arc::new(resolver),
        Arc::new(network),
    ))
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
