//! Application configuration.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use payout_proxy::ProxyConfig;
use payout_session::SessionConfig;
use payout_telemetry::RuntimeEnv;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// How the dashboard reaches the statement data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// WebSocket session straight to the trading API.
    #[default]
    Socket,
    /// HTTP through the proxy.
    Proxy,
}

impl FromStr for Transport {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "socket" => Ok(Self::Socket),
            "proxy" => Ok(Self::Proxy),
            other => Err(AppError::Config(format!(
                "Unknown transport '{other}' (expected socket or proxy)"
            ))),
        }
    }
}

/// Trading API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamSettings {
    /// Base URL of the REST API; the proxy posts to `{api_url}/statement`.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// WebSocket endpoint for the session protocol.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Deadline for one fetch, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_api_url() -> String {
    payout_upstream::DEFAULT_API_URL.to_string()
}

fn default_ws_url() -> String {
    SessionConfig::default().url
}

fn default_timeout_ms() -> u64 {
    8_000
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            ws_url: default_ws_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl UpstreamSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            url: self.ws_url.clone(),
            timeout: self.timeout(),
        }
    }
}

/// Dashboard (CLI) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSettings {
    #[serde(default)]
    pub transport: Transport,
    /// Commissions endpoint used by the proxy transport.
    #[serde(default = "default_proxy_url")]
    pub proxy_url: String,
    /// Where the signed-in session is kept.
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,
}

fn default_proxy_url() -> String {
    format!("http://localhost:5000{}", payout_proxy::COMMISSIONS_ROUTE)
}

fn default_session_file() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(".payout")
        .join("session.json")
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            transport: Transport::default(),
            proxy_url: default_proxy_url(),
            session_file: default_session_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Where `AppConfig::load` found its settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    File,
    /// The file was missing.
    Defaults,
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub upstream: UpstreamSettings,
    #[serde(default)]
    pub dashboard: DashboardSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl AppConfig {
    /// Load from `path` if it exists (defaults otherwise), then apply
    /// environment overrides. Runs before logging is up, so the caller
    /// reports where the settings came from.
    pub fn load(path: &str) -> AppResult<(Self, ConfigSource)> {
        let (mut config, source) = if Path::new(path).exists() {
            (Self::from_file(path)?, ConfigSource::File)
        } else {
            (Self::default(), ConfigSource::Defaults)
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok((config, source))
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Apply the deployment variables: `PORT`, `ALLOWED_ORIGIN`,
    /// `DERIV_API_URL` and `PAYOUT_ENV`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> AppResult<()> {
        if let Some(port) = lookup("PORT") {
            self.proxy.port = port
                .trim()
                .parse()
                .map_err(|_| AppError::Config(format!("Invalid PORT: {port}")))?;
        }
        if let Some(origin) = lookup("ALLOWED_ORIGIN") {
            self.proxy.allowed_origin = origin;
        }
        if let Some(url) = lookup("DERIV_API_URL") {
            self.upstream.api_url = url;
        }
        if RuntimeEnv::parse(lookup("PAYOUT_ENV").as_deref()) == RuntimeEnv::Development {
            self.proxy.expose_error_details = true;
        }
        Ok(())
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.upstream.timeout_ms == 0 {
            return Err(AppError::Config("upstream.timeout_ms must be > 0".to_string()));
        }
        if self.upstream.api_url.trim().is_empty() {
            return Err(AppError::Config("upstream.api_url must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.proxy.port, 5000);
        assert_eq!(config.proxy.allowed_origin, "http://localhost:3000");
        assert_eq!(config.upstream.api_url, "https://api.deriv.com");
        assert_eq!(
            config.upstream.ws_url,
            "wss://ws.binaryws.com/websockets/v3?app_id=1089"
        );
        assert_eq!(config.upstream.timeout(), Duration::from_secs(8));
        assert_eq!(config.dashboard.transport, Transport::Socket);
        assert_eq!(
            config.dashboard.proxy_url,
            "http://localhost:5000/api/deriv-commissions"
        );
        assert!(config.dashboard.session_file.ends_with(".payout/session.json"));
    }

    #[test]
    fn test_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [proxy]
            port = 8081

            [dashboard]
            transport = "proxy"
            session_file = "/tmp/s.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.proxy.port, 8081);
        assert_eq!(config.proxy.allowed_origin, "http://localhost:3000");
        assert_eq!(config.dashboard.transport, Transport::Proxy);
        assert_eq!(config.dashboard.session_file, PathBuf::from("/tmp/s.json"));
        assert_eq!(config.upstream.timeout_ms, 8000);
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(env(&[
                ("PORT", "7000"),
                ("ALLOWED_ORIGIN", "https://dash.example.com"),
                ("DERIV_API_URL", "http://127.0.0.1:9999"),
                ("PAYOUT_ENV", "development"),
            ]))
            .unwrap();
        assert_eq!(config.proxy.port, 7000);
        assert_eq!(config.proxy.allowed_origin, "https://dash.example.com");
        assert_eq!(config.upstream.api_url, "http://127.0.0.1:9999");
        assert!(config.proxy.expose_error_details);
    }

    #[test]
    fn test_production_hides_details() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(env(&[("PAYOUT_ENV", "production")]))
            .unwrap();
        assert!(!config.proxy.expose_error_details);
    }

    #[test]
    fn test_invalid_port_override() {
        let mut config = AppConfig::default();
        let err = config.apply_overrides(env(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = AppConfig::default();
        config.upstream.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");

        let (config, source) = AppConfig::load(path.to_str().unwrap()).unwrap();

        assert_eq!(source, ConfigSource::Defaults);
        assert_eq!(config.upstream.timeout_ms, 8_000);
    }

    #[test]
    fn test_load_existing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("payout.toml");
        std::fs::write(&path, "[upstream]\ntimeout_ms = 3000\n").unwrap();

        let (config, source) = AppConfig::load(path.to_str().unwrap()).unwrap();

        assert_eq!(source, ConfigSource::File);
        assert_eq!(config.upstream.timeout_ms, 3_000);
    }

    #[test]
    fn test_transport_parse() {
        assert_eq!("proxy".parse::<Transport>().unwrap(), Transport::Proxy);
        assert!("carrier-pigeon".parse::<Transport>().is_err());
    }
}
