//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SOUK_*)
//! 2. TOML config file (if SOUK_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SOUK_*)
/// 2. TOML config file (if SOUK_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin of the marketplace application and its backend.
    ///
    /// Relative request paths, replay endpoints and the connectivity probe
    /// resolve against it. Set via SOUK_ORIGIN.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to the SQLite database holding the response cache partitions.
    ///
    /// Set via SOUK_CACHE_DB_PATH environment variable.
    #[serde(default = "default_cache_db_path")]
    pub cache_db_path: PathBuf,

    /// Path to the SQLite database backing the persistent local store.
    ///
    /// Set via SOUK_STORE_DB_PATH environment variable.
    #[serde(default = "default_store_db_path")]
    pub store_db_path: PathBuf,

    /// Deployment version baked into every partition name.
    ///
    /// Changing it makes the previous deployment's partitions stale.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SOUK_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via SOUK_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Exact paths pre-cached on install and served cache-first.
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,

    /// Path prefixes treated as API calls in addition to `/api/`.
    #[serde(default = "default_api_endpoints")]
    pub api_endpoints: Vec<String>,

    /// Record kinds with a background-sync queue and a replay endpoint.
    #[serde(default = "default_sync_kinds")]
    pub sync_kinds: Vec<String>,

    /// Cached document served to navigations when offline.
    #[serde(default = "default_offline_shell_path")]
    pub offline_shell_path: String,

    /// Path requested by the connectivity probe.
    #[serde(default = "default_probe_path")]
    pub probe_path: String,

    /// Interval between connectivity probes in milliseconds.
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,

    /// Storage quota reported by the storage estimate, in bytes.
    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: u64,
}

fn default_origin() -> String {
    "http://localhost:5173".into()
}

fn default_cache_db_path() -> PathBuf {
    PathBuf::from("./souk-cache.sqlite")
}

fn default_store_db_path() -> PathBuf {
    PathBuf::from("./souk-offline.sqlite")
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_user_agent() -> String {
    "souk-worker/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_static_assets() -> Vec<String> {
    ["/", "/index.html", "/manifest.json", "/favicon.ico", "/icons/icon-192x192.png", "/icons/icon-512x512.png"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_api_endpoints() -> Vec<String> {
    ["/rest/v1/", "/auth/v1/", "/storage/v1/", "/functions/v1/"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_sync_kinds() -> Vec<String> {
    vec!["products".into(), "messages".into()]
}

fn default_offline_shell_path() -> String {
    "/".into()
}

fn default_probe_path() -> String {
    "/manifest.json".into()
}

fn default_probe_interval_ms() -> u64 {
    30_000
}

fn default_quota_bytes() -> u64 {
    50 * 1024 * 1024 // 50MB
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            cache_db_path: default_cache_db_path(),
            store_db_path: default_store_db_path(),
            cache_version: default_cache_version(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            static_assets: default_static_assets(),
            api_endpoints: default_api_endpoints(),
            sync_kinds: default_sync_kinds(),
            offline_shell_path: default_offline_shell_path(),
            probe_path: default_probe_path(),
            probe_interval_ms: default_probe_interval_ms(),
            quota_bytes: default_quota_bytes(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Probe interval as Duration for use with tokio timers.
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SOUK_`
    /// 2. TOML file from `SOUK_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SOUK_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SOUK_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.origin, "http://localhost:5173");
        assert_eq!(config.cache_db_path, PathBuf::from("./souk-cache.sqlite"));
        assert_eq!(config.store_db_path, PathBuf::from("./souk-offline.sqlite"));
        assert_eq!(config.cache_version, "v1");
        assert_eq!(config.user_agent, "souk-worker/0.1");
        assert_eq!(config.timeout_ms, 20_000);
        assert!(config.static_assets.contains(&"/".to_string()));
        assert_eq!(config.sync_kinds, vec!["products".to_string(), "messages".to_string()]);
        assert_eq!(config.offline_shell_path, "/");
        assert_eq!(config.quota_bytes, 50 * 1024 * 1024);
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
        assert_eq!(config.probe_interval(), Duration::from_millis(30_000));
    }

    #[test]
    fn test_toml_layer_overrides_defaults() {
        let toml = r#"
            origin = "https://souk.example"
            cache_version = "v7"
            sync_kinds = ["products"]
        "#;
        let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string(toml))
            .extract()
            .unwrap();

        assert_eq!(config.origin, "https://souk.example");
        assert_eq!(config.cache_version, "v7");
        assert_eq!(config.sync_kinds, vec!["products".to_string()]);
        assert_eq!(config.timeout_ms, 20_000);
    }
}
