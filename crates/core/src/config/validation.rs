//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an http(s) URL
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` or `cache_version` is empty
    /// - a sync kind is not a lowercase identifier
    /// - `quota_bytes` is 0 or `probe_interval_ms` is below one second
    ///
    /// Returns `ConfigError::Missing` if no sync kind is configured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") => {}
            Ok(origin) => {
                return Err(ConfigError::Invalid {
                    field: "origin".into(),
                    reason: format!("unsupported scheme: {}", origin.scheme()),
                });
            }
            Err(e) => return Err(ConfigError::Invalid { field: "origin".into(), reason: e.to_string() }),
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.cache_version.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "cache_version".into(), reason: "must not be empty".into() });
        }

        if self.sync_kinds.is_empty() {
            return Err(ConfigError::Missing {
                field: "sync_kinds".into(),
                hint: "Configure at least one record kind, e.g. sync_kinds = [\"products\"]".into(),
            });
        }
        if let Some(kind) =
            self.sync_kinds.iter().find(|k| k.is_empty() || !k.chars().all(|c| c.is_ascii_lowercase() || c == '_'))
        {
            return Err(ConfigError::Invalid {
                field: "sync_kinds".into(),
                reason: format!("'{kind}' must be a lowercase identifier"),
            });
        }

        if !self.offline_shell_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                field: "offline_shell_path".into(),
                reason: "must be an absolute path".into(),
            });
        }

        if self.quota_bytes == 0 {
            return Err(ConfigError::Invalid { field: "quota_bytes".into(), reason: "must be greater than 0".into() });
        }

        if self.probe_interval_ms < 1_000 {
            return Err(ConfigError::Invalid {
                field: "probe_interval_ms".into(),
                reason: "must be at least 1000ms".into(),
            });
        }

        if !self.static_assets.iter().any(|a| a == &self.offline_shell_path) {
            tracing::warn!(
                offline_shell_path = %self.offline_shell_path,
                "Offline shell is not part of static_assets; navigations cannot fall back until it is cached"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_origin_scheme() {
        let config = AppConfig { origin: "ftp://souk.example".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_validate_origin_unparseable() {
        let config = AppConfig { origin: "not a url".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_timeout_exceeds_limit() {
        let config = AppConfig { timeout_ms: 301_000, ..Default::default() }; // 5min 1sec
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_empty_cache_version() {
        let config = AppConfig { cache_version: "  ".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "cache_version"));
    }

    #[test]
    fn test_validate_no_sync_kinds() {
        let config = AppConfig { sync_kinds: Vec::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Missing { field, .. }) if field == "sync_kinds"));
    }

    #[test]
    fn test_validate_bad_sync_kind() {
        let config = AppConfig { sync_kinds: vec!["products".into(), "Bad Kind".into()], ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "sync_kinds"));
    }

    #[test]
    fn test_validate_relative_shell_path() {
        let config = AppConfig { offline_shell_path: "index.html".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "offline_shell_path"));
    }

    #[test]
    fn test_validate_zero_quota() {
        let config = AppConfig { quota_bytes: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "quota_bytes"));
    }

    #[test]
    fn test_validate_probe_interval() {
        let config = AppConfig { probe_interval_ms: 10, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "probe_interval_ms"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { timeout_ms: 100, probe_interval_ms: 1_000, quota_bytes: 1, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
