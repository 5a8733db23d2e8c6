// src/server/mod.rs
use crate::health::{HealthMonitor, HealthStatus};
use crate::metrics::MetricsRegistry;
use anyhow::{Context, Result};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Serves Prometheus metrics and the latest health result.
pub struct StatusServer {
    registry: Arc<MetricsRegistry>,
    monitor: Option<Arc<HealthMonitor>>,
    metrics_path: String,
}

impl StatusServer {
    pub fn new(
        registry: Arc<MetricsRegistry>,
        monitor: Option<Arc<HealthMonitor>>,
        metrics_path: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            monitor,
            metrics_path: metrics_path.into(),
        }
    }

    /// Bind and serve in the background. Returns the bound address.
    pub fn spawn(self, addr: SocketAddr) -> Result<(SocketAddr, JoinHandle<()>)> {
        let status = Arc::new(self);

        let make_service = make_service_fn(move |_| {
            let status = status.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                    let status = status.clone();
                    async move { Ok::<_, Infallible>(status.route(&req)) }
                }))
            }
        });

        let server = Server::try_bind(&addr)
            .with_context(|| format!("Failed to bind status server on {}", addr))?
            .serve(make_service);
        let local_addr = server.local_addr();

        info!("Status server listening on http://{}", local_addr);

        let handle = tokio::spawn(async move {
            if let Err(e) = server.await {
                error!("Status server error: {}", e);
            }
        });

        Ok((local_addr, handle))
    }

    pub fn route(&self, req: &Request<Body>) -> Response<Body> {
        if req.method() != Method::GET {
            return text(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
        }

        match req.uri().path() {
            path if path == self.metrics_path => self.metrics(),
            "/health" => self.health(),
            _ => text(StatusCode::NOT_FOUND, "Not Found"),
        }
    }

    fn metrics(&self) -> Response<Body> {
        match self.registry.gather() {
            Ok(buffer) => {
                let mut response = Response::new(Body::from(buffer));
                response.headers_mut().insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; version=0.0.4"),
                );
                response
            }
            Err(e) => {
                error!("Failed to encode metrics: {}", e);
                text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }

    fn health(&self) -> Response<Body> {
        let Some(latest) = self.monitor.as_ref().and_then(|monitor| monitor.latest()) else {
            return json(
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({ "status": "unknown" }).to_string(),
            );
        };

        let status = match latest.status {
            HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        };

        match serde_json::to_string(latest.as_ref()) {
            Ok(body) => json(status, body),
            Err(e) => {
                error!("Failed to serialize health result: {}", e);
                text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }
}

fn text(status: StatusCode, body: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
}

fn json(status: StatusCode, body: String) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{
        DependencyHandle, DependencyResolver, EnvironmentReport, EnvironmentValidator,
        HealthProbes, NetworkProbe,
    };
    use async_trait::async_trait;
    use tokio::time::{sleep, Duration};

    struct Probe {
        online: bool,
    }

    impl EnvironmentValidator for Probe {
        fn validate(&self) -> anyhow::Result<EnvironmentReport> {
            Ok(EnvironmentReport::from_errors(Vec::new()))
        }
    }

    #[async_trait]
    impl DependencyResolver for Probe {
        async fn resolve(&self) -> anyhow::Result<Option<DependencyHandle>> {
            Ok(None)
        }
    }

    #[async_trait]
    impl NetworkProbe for Probe {
        async fn is_online(&self) -> anyhow::Result<bool> {
            Ok(self.online)
        }
    }

    fn monitor(online: bool) -> Arc<HealthMonitor> {
        let probe = Arc::new(Probe { online });
        Arc::new(HealthMonitor::new(
            HealthProbes::new(probe.clone(), probe.clone(), probe),
            None,
        ))
    }

    async fn wait_for_result(monitor: &HealthMonitor) {
        for _ in 0..100 {
            if monitor.latest().is_some() {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("health monitor produced no result");
    }

    fn get(path: &str) -> Request<Body> {
        Request::get(path).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_routes() {
        let registry = Arc::new(MetricsRegistry::new().unwrap());
        registry.collector().record_expiration_skipped("hourly");
        let server = StatusServer::new(registry, None, "/metrics");

        assert_eq!(server.route(&get("/metrics")).status(), StatusCode::OK);
        assert_eq!(server.route(&get("/nope")).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            server.route(&get("/health")).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );

        let post = Request::post("/metrics").body(Body::empty()).unwrap();
        assert_eq!(server.route(&post).status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_health_status_codes() {
        let registry = Arc::new(MetricsRegistry::new().unwrap());

        // Environment ok, dependency missing, network up: degraded
        let degraded = monitor(true);
        degraded.start(Duration::from_secs(60));
        wait_for_result(&degraded).await;
        degraded.stop();
        let server = StatusServer::new(registry.clone(), Some(degraded), "/metrics");
        assert_eq!(server.route(&get("/health")).status(), StatusCode::OK);

        // Only the environment check passes: unhealthy
        let unhealthy = monitor(false);
        unhealthy.start(Duration::from_secs(60));
        wait_for_result(&unhealthy).await;
        unhealthy.stop();
        let server = StatusServer::new(registry, Some(unhealthy), "/metrics");
        assert_eq!(
            server.route(&get("/health")).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_serves_over_http() {
        let registry = Arc::new(MetricsRegistry::new().unwrap());
        let (addr, handle) = StatusServer::new(registry, None, "/metrics")
            .spawn("127.0.0.1:0".parse().unwrap())
            .unwrap();

        let response = reqwest::get(format!("http://{}/metrics", addr)).await.unwrap();
        assert_eq!(response.status().as_u16(), 200);

        handle.abort();
    }
}
