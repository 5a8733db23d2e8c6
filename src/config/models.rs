// src/config/models.rs
use crate::health::{EnvironmentReport, EnvironmentValidator, HealthMonitor};
use crate::timezone::{self, CAMPUS_UTC_OFFSET};
use anyhow::{bail, Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

use super::env_var_name;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub environment: AppEnvironment,
    pub firebase: FirebaseConfig,
    pub google: GoogleConfig,
    pub logging: LoggingConfig,
    pub scheduler: SchedulerConfig,
    pub health: HealthConfig,
    pub leave_service: LeaveServiceConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnvironment {
    Production,
    #[default]
    Development,
    Test,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
    pub measurement_id: String,
    pub database_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub api_key: String,
    pub client_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Overrides the environment's default level when set.
    pub level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    /// Campus UTC offset; midnight runs align to this zone.
    pub timezone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub enabled: bool,
    pub interval_ms: u64,
    pub network_probe_addr: String,
    pub probe_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaveServiceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
    pub path: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 3600,
            timezone: CAMPUS_UTC_OFFSET.to_string(),
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: HealthMonitor::DEFAULT_INTERVAL.as_millis() as u64,
            network_probe_addr: "8.8.8.8:53".to_string(),
            probe_timeout_ms: 3000,
        }
    }
}

impl Default for LeaveServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8081/".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 9090,
            path: "/metrics".to_string(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.interval_secs == 0 {
            bail!("scheduler.interval_secs must be greater than zero");
        }
        if self.health.interval_ms == 0 {
            bail!("health.interval_ms must be greater than zero");
        }
        if self.health.probe_timeout_ms == 0 {
            bail!("health.probe_timeout_ms must be greater than zero");
        }
        if self.leave_service.timeout_secs == 0 {
            bail!("leave_service.timeout_secs must be greater than zero");
        }
        if !self.metrics.path.starts_with('/') {
            bail!("metrics.path must start with '/'");
        }
        self.scheduler.offset()?;
        self.leave_service.base_url()?;
        self.health
            .network_probe_addr
            .parse::<SocketAddr>()
            .with_context(|| {
                format!(
                    "health.network_probe_addr '{}' is not a socket address",
                    self.health.network_probe_addr
                )
            })?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == AppEnvironment::Production
    }

    /// Log level used when `RUST_LOG` is not set.
    pub fn log_level(&self) -> &str {
        match &self.logging.level {
            Some(level) => level.as_str(),
            None if self.is_production() => "error",
            None => "debug",
        }
    }

    fn required_settings(&self) -> [(&'static str, &'static str, &str); 5] {
        [
            ("firebase", "api_key", &self.firebase.api_key),
            ("firebase", "auth_domain", &self.firebase.auth_domain),
            ("firebase", "project_id", &self.firebase.project_id),
            ("google", "api_key", &self.google.api_key),
            ("google", "client_id", &self.google.client_id),
        ]
    }
}

impl EnvironmentValidator for Config {
    fn validate(&self) -> Result<EnvironmentReport> {
        let errors: Vec<String> = self
            .required_settings()
            .iter()
            .filter(|(_, _, value)| value.trim().is_empty())
            .map(|(section, key, _)| format!("{} is missing", env_var_name(section, key)))
            .collect();

        Ok(EnvironmentReport::from_errors(errors))
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn offset(&self) -> Result<FixedOffset> {
        Ok(timezone::parse_offset(&self.timezone)?)
    }
}

impl HealthConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl LeaveServiceConfig {
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.base_url)
            .with_context(|| format!("leave_service.base_url '{}' is not a valid URL", self.base_url))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> Config {
        let mut config = Config::default();
        config.firebase.api_key = "key".into();
        config.firebase.auth_domain = "campus.firebaseapp.com".into();
        config.firebase.project_id = "campus".into();
        config.google.api_key = "gkey".into();
        config.google.client_id = "client".into();
        config
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.scheduler.offset().unwrap().local_minus_utc(), 19_800);
        assert_eq!(config.health.interval(), HealthMonitor::DEFAULT_INTERVAL);
        assert_eq!(config.health.interval_ms, 60_000);
    }

    #[test]
    fn test_complete_environment_is_valid() {
        let report = EnvironmentValidator::validate(&complete()).unwrap();
        assert!(report.valid);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_missing_settings_are_reported_by_env_name() {
        let mut config = complete();
        config.firebase.project_id.clear();
        config.google.client_id = "   ".into();

        let report = EnvironmentValidator::validate(&config).unwrap();
        assert!(!report.valid);
        assert_eq!(
            report.errors,
            vec![
                "LEAVE_FIREBASE__PROJECT_ID is missing".to_string(),
                "LEAVE_GOOGLE__CLIENT_ID is missing".to_string(),
            ]
        );
    }

    #[test]
    fn test_log_level_follows_environment() {
        let mut config = Config::default();
        assert_eq!(config.log_level(), "debug");

        config.environment = AppEnvironment::Production;
        assert_eq!(config.log_level(), "error");

        config.logging.level = Some("info".into());
        assert_eq!(config.log_level(), "info");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.scheduler.timezone = "IST".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.leave_service.base_url = "not a url".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.health.network_probe_addr = "localhost".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.metrics.path = "metrics".into();
        assert!(config.validate().is_err());
    }
}
