// src/health/probes.rs
use super::checks::{DependencyHandle, DependencyResolver, NetworkProbe};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};
use tracing::debug;
use url::Url;

/// Reports online when a TCP connection to a well-known address succeeds.
pub struct TcpNetworkProbe {
    addr: String,
    timeout: Duration,
}

impl TcpNetworkProbe {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }
}

#[async_trait]
impl NetworkProbe for TcpNetworkProbe {
    async fn is_online(&self) -> Result<bool> {
        let addr: SocketAddr = self
            .addr
            .parse()
            .with_context(|| format!("Invalid network probe address '{}'", self.addr))?;

        match timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_)) => Ok(true),
            Ok(Err(e)) => {
                debug!(%addr, error = %e, "Network probe connection failed");
                Ok(false)
            }
            Err(_) => {
                debug!(%addr, "Network probe timed out");
                Ok(false)
            }
        }
    }
}

/// Resolves the authentication backend from its configured domain.
pub struct AuthDomainResolver {
    client: Client,
    auth_domain: String,
}

impl AuthDomainResolver {
    pub fn new(auth_domain: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            auth_domain: auth_domain.into(),
        })
    }

    fn endpoint(&self) -> Result<Option<Url>> {
        let domain = self.auth_domain.trim();
        if domain.is_empty() {
            return Ok(None);
        }

        let raw = if domain.starts_with("http://") || domain.starts_with("https://") {
            domain.to_string()
        } else {
            format!("https://{}/", domain)
        };

        let url = Url::parse(&raw).with_context(|| format!("Invalid auth domain '{}'", domain))?;
        Ok(Some(url))
    }
}

#[async_trait]
impl DependencyResolver for AuthDomainResolver {
    async fn resolve(&self) -> Result<Option<DependencyHandle>> {
        let Some(url) = self.endpoint()? else {
            return Ok(None);
        };

        // Any HTTP response means the backend is reachable
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .with_context(|| format!("Auth backend {} unreachable", url))?;

        debug!(%url, status = %response.status(), "Auth backend responded");

        Ok(Some(DependencyHandle {
            name: "auth".to_string(),
            endpoint: Some(url),
        }))
    }
}
