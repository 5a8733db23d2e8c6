// src/leave/client.rs
use super::service::{LeaveManagementService, LeaveStep};
use crate::config::LeaveServiceConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum LeaveServiceError {
    #[error("Leave service returned HTTP {status} for {step}")]
    UnexpectedStatus { step: LeaveStep, status: StatusCode },
}

/// [`LeaveManagementService`] backed by the leave management HTTP API.
pub struct HttpLeaveService {
    client: Client,
    base_url: Url,
}

impl HttpLeaveService {
    pub fn new(mut base_url: Url, timeout: Duration) -> Result<Self> {
        // Keep the last path segment when joining endpoint paths
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &LeaveServiceConfig) -> Result<Self> {
        Self::new(config.base_url()?, config.timeout())
    }

    fn endpoint(step: LeaveStep) -> &'static str {
        match step {
            LeaveStep::ActivateFutureLeaves => "leaves/activate-future",
            LeaveStep::ExpireKitchenLeaves => "leaves/expire-kitchen",
            LeaveStep::CheckExpiredOnLeaves => "leaves/check-expired-on",
        }
    }

    async fn trigger(&self, step: LeaveStep) -> Result<()> {
        let url = self.base_url.join(Self::endpoint(step))?;

        let response = self
            .client
            .post(url.as_str())
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LeaveServiceError::UnexpectedStatus { step, status }.into());
        }

        debug!(%step, %status, "Leave service step acknowledged");
        Ok(())
    }
}

#[async_trait]
impl LeaveManagementService for HttpLeaveService {
    async fn activate_future_leaves(&self) -> Result<()> {
        self.trigger(LeaveStep::ActivateFutureLeaves).await
    }

    async fn expire_kitchen_leaves(&self) -> Result<()> {
        self.trigger(LeaveStep::ExpireKitchenLeaves).await
    }

    async fn check_expired_on_leaves(&self) -> Result<()> {
        self.trigger(LeaveStep::CheckExpiredOnLeaves).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(base: &str) -> HttpLeaveService {
        HttpLeaveService::new(Url::parse(base).unwrap(), Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_steps_post_to_their_endpoints() {
        let mut server = mockito::Server::new_async().await;
        let activate = server
            .mock("POST", "/api/leaves/activate-future")
            .with_status(204)
            .create_async()
            .await;
        let kitchen = server
            .mock("POST", "/api/leaves/expire-kitchen")
            .with_status(200)
            .create_async()
            .await;
        let on_leave = server
            .mock("POST", "/api/leaves/check-expired-on")
            .with_status(200)
            .create_async()
            .await;

        let client = service(&format!("{}/api", server.url()));
        for step in LeaveStep::SEQUENCE {
            step.run(&client).await.unwrap();
        }

        activate.assert_async().await;
        kitchen.assert_async().await;
        on_leave.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/leaves/expire-kitchen")
            .with_status(500)
            .create_async()
            .await;

        let client = service(&server.url());
        let err = client.expire_kitchen_leaves().await.unwrap_err();

        match err.downcast_ref::<LeaveServiceError>() {
            Some(LeaveServiceError::UnexpectedStatus { step, status }) => {
                assert_eq!(*step, LeaveStep::ExpireKitchenLeaves);
                assert_eq!(*status, StatusCode::INTERNAL_SERVER_ERROR);
            }
            None => panic!("unexpected error: {:#}", err),
        }
    }

    #[test]
    fn test_from_config_rejects_bad_url() {
        let config = LeaveServiceConfig {
            base_url: "::nope".into(),
            timeout_secs: 5,
        };
        assert!(HttpLeaveService::from_config(&config).is_err());
    }
}
