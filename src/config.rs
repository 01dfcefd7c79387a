//! Application configuration loading.
//!
//! Settings come from an optional TOML file with an environment-variable
//! override for the cache database location. Everything has a sensible
//! default so the engine can start with no configuration at all.

use crate::{
    errors::{Error, Result},
    models::NotificationPrefs,
};
use serde::Deserialize;
use std::path::Path;

/// Environment variable overriding the cache database URL.
pub const DATABASE_URL_ENV: &str = "NESTEGG_DATABASE_URL";

fn default_database_url() -> String {
    "sqlite://data/nestegg_cache.sqlite?mode=rwc".to_string()
}

fn default_report_months() -> u32 {
    6
}

/// Application configuration, typically parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Where the local cache database lives
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// How many trailing months the monthly report covers
    #[serde(default = "default_report_months")]
    pub report_months: u32,
    /// Notification preferences used until the user changes them
    #[serde(default)]
    pub notifications: NotificationPrefs,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            report_months: default_report_months(),
            notifications: NotificationPrefs::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file, then applies the
    /// `NESTEGG_DATABASE_URL` environment override if set.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
            message: format!("Failed to read config file: {e}"),
        })?;

        let mut config: Self = toml::from_str(&contents).map_err(|e| Error::Config {
            message: format!("Failed to parse config.toml: {e}"),
        })?;

        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            config.database_url = url;
        }

        Ok(config)
    }

    /// Loads configuration from the default location (`./config.toml`),
    /// falling back to defaults when the file is absent.
    pub fn load_or_default() -> Self {
        match Self::load("config.toml") {
            Ok(config) => config,
            Err(_) => {
                let mut config = Self::default();
                if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
                    config.database_url = url;
                }
                config
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            database_url = "sqlite::memory:"
            report_months = 12

            [notifications]
            milestoneAlerts = false
            syncAlerts = true
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.report_months, 12);
        assert!(!config.notifications.milestone_alerts);
        assert!(config.notifications.sync_alerts);
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.report_months, 6);
        assert!(config.notifications.milestone_alerts);
        assert!(config.database_url.starts_with("sqlite://"));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = AppConfig::load("/definitely/not/here.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
