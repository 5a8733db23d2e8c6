// src/config/mod.rs
mod models;

pub use models::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Prefix of every environment variable read by [`load_config`].
pub const ENV_PREFIX: &str = "LEAVE";
/// Separator between nested keys, e.g. `LEAVE_FIREBASE__API_KEY`.
pub const ENV_SEPARATOR: &str = "__";

/// Load configuration from an optional file (YAML or JSON) overlaid by
/// `LEAVE_*` environment variables.
///
/// Environment values stay strings until deserialization, so numeric-looking
/// keys and ids keep their exact text.
pub fn load_config<P: AsRef<Path>>(path: Option<P>) -> Result<Config> {
    let mut builder = ::config::Config::builder();

    if let Some(path) = path {
        let path = path.as_ref();
        builder = builder.add_source(::config::File::from(path).required(false));
    }

    let settings = builder
        .add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator(ENV_SEPARATOR),
        )
        .build()
        .context("Failed to read configuration sources")?;

    let config: Config = settings
        .try_deserialize()
        .context("Failed to parse configuration")?;

    config.validate()?;
    Ok(config)
}

/// Name of the environment variable that sets a nested key.
pub fn env_var_name(section: &str, key: &str) -> String {
    format!(
        "{}_{}{}{}",
        ENV_PREFIX,
        section.to_uppercase(),
        ENV_SEPARATOR,
        key.to_uppercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(extension: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "leave-runtime-{}.{}",
            uuid::Uuid::new_v4(),
            extension
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_env_var_name() {
        assert_eq!(env_var_name("firebase", "api_key"), "LEAVE_FIREBASE__API_KEY");
    }

    #[test]
    fn test_load_yaml_config() {
        let path = write_temp(
            "yaml",
            r#"
environment: production
firebase:
  api_key: key
  auth_domain: campus.firebaseapp.com
  project_id: campus
scheduler:
  interval_secs: 600
  timezone: "+05:30"
health:
  interval_ms: 15000
"#,
        );

        let config = load_config(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.environment, AppEnvironment::Production);
        assert_eq!(config.firebase.project_id, "campus");
        assert_eq!(config.scheduler.interval().as_secs(), 600);
        assert_eq!(config.health.interval().as_millis(), 15_000);
        // Untouched sections keep their defaults
        assert_eq!(config.leave_service.timeout_secs, 30);
        assert_eq!(config.metrics.path, "/metrics");
    }

    #[test]
    fn test_load_json_config() {
        let path = write_temp(
            "json",
            r#"{ "environment": "test", "google": { "api_key": "g", "client_id": "c" } }"#,
        );

        let config = load_config(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.environment, AppEnvironment::Test);
        assert_eq!(config.google.client_id, "c");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("leave-runtime-does-not-exist.yaml");
        let config = load_config(Some(&path)).unwrap();

        assert_eq!(config.scheduler.interval().as_secs(), 3600);
        assert_eq!(config.health.interval().as_millis(), 60_000);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let path = write_temp("yaml", "scheduler:\n  interval_secs: 0\n");
        let result = load_config(Some(&path));
        std::fs::remove_file(&path).ok();

        assert!(result.is_err());
    }
}
