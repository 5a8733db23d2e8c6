// src/logging/mod.rs
use crate::config::Config;
use anyhow::Result;
use std::any::Any;
use tracing_subscriber::EnvFilter;

/// Build the log filter. `RUST_LOG` wins; otherwise the level comes from
/// the configured environment.
pub fn env_filter(config: &Config) -> Result<EnvFilter> {
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        return Ok(EnvFilter::from_default_env());
    }

    Ok(EnvFilter::new("warn")
        .add_directive(format!("leave_runtime={}", config.log_level()).parse()?)
        .add_directive("hyper=info".parse()?))
}

/// Install the global `tracing` subscriber.
pub fn init(config: &Config) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(config)?)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}

/// Best-effort text of a caught panic payload.
pub(crate) fn describe_panic(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
