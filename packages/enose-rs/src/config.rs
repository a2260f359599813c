// Client configuration loaded from environment variables
//
// A `.env` file in the working directory is honored. Every value has a
// default except the ingestion API key.

use crate::connection::DEFAULT_BACKOFF;
use crate::surface::{SIMULATION_CAPACITY, TELEMETRY_CAPACITY};
use crate::types::StreamKind;
use std::env;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const DEFAULT_EDGE_IMPULSE_URL: &str = "https://ingestion.edgeimpulse.com/api/training/data";
pub const DEFAULT_LOG_CAPACITY: usize = 1_000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the backend HTTP API
    pub api_url: String,
    /// Telemetry stream endpoint
    pub ws_url: String,
    /// Backend log stream endpoint
    pub ws_log_url: String,
    /// Simulation stream endpoint
    pub ws_sim_url: String,
    /// Fixed wait between reconnect attempts
    pub reconnect_backoff: Duration,
    pub telemetry_capacity: usize,
    pub simulation_capacity: usize,
    /// Maximum retained backend log lines
    pub log_capacity: usize,
    /// Timeout for each outbound HTTP request
    pub request_timeout: Duration,
    pub edge_impulse_url: String,
    /// Required for uploads only
    pub edge_impulse_api_key: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::for_api_url(DEFAULT_API_URL)
    }
}

impl ClientConfig {
    /// Defaults with every stream endpoint derived from `api_url`
    pub fn for_api_url(api_url: &str) -> Self {
        let api_url = api_url.trim_end_matches('/').to_string();
        Self {
            ws_url: derive_ws_url(&api_url, "/ws"),
            ws_log_url: derive_ws_url(&api_url, "/logs"),
            ws_sim_url: derive_ws_url(&api_url, "/sim/ws"),
            api_url,
            reconnect_backoff: DEFAULT_BACKOFF,
            telemetry_capacity: TELEMETRY_CAPACITY,
            simulation_capacity: SIMULATION_CAPACITY,
            log_capacity: DEFAULT_LOG_CAPACITY,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            edge_impulse_url: DEFAULT_EDGE_IMPULSE_URL.to_string(),
            edge_impulse_api_key: None,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("ENOSE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue(format!(
                "ENOSE_API_URL must start with http:// or https://, got '{}'",
                api_url
            )));
        }

        let mut config = Self::for_api_url(&api_url);

        if let Some(url) = lookup("ENOSE_WS_URL") {
            config.ws_url = url;
        }
        if let Some(url) = lookup("ENOSE_WS_LOG_URL") {
            config.ws_log_url = url;
        }
        if let Some(url) = lookup("ENOSE_WS_SIM_URL") {
            config.ws_sim_url = url;
        }

        let backoff_ms: u64 = parse_or(&lookup, "ENOSE_RECONNECT_BACKOFF_MS", 1_000)?;
        if backoff_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "ENOSE_RECONNECT_BACKOFF_MS must be greater than zero".to_string(),
            ));
        }
        config.reconnect_backoff = Duration::from_millis(backoff_ms);

        config.telemetry_capacity =
            parse_or(&lookup, "ENOSE_TELEMETRY_CAPACITY", TELEMETRY_CAPACITY)?;
        config.simulation_capacity =
            parse_or(&lookup, "ENOSE_SIMULATION_CAPACITY", SIMULATION_CAPACITY)?;
        config.log_capacity = parse_or(&lookup, "ENOSE_LOG_CAPACITY", DEFAULT_LOG_CAPACITY)?;
        config.request_timeout = Duration::from_secs(parse_or(
            &lookup,
            "ENOSE_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);

        if let Some(url) = lookup("EDGE_IMPULSE_URL") {
            config.edge_impulse_url = url;
        }
        config.edge_impulse_api_key = lookup("EDGE_IMPULSE_API_KEY").filter(|k| !k.is_empty());

        Ok(config)
    }

    /// Point at another backend, re-deriving every stream endpoint
    pub fn with_api_url(mut self, api_url: &str) -> Result<Self, ConfigError> {
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue(format!(
                "API URL must start with http:// or https://, got '{}'",
                api_url
            )));
        }
        let derived = Self::for_api_url(api_url);
        self.api_url = derived.api_url;
        self.ws_url = derived.ws_url;
        self.ws_log_url = derived.ws_log_url;
        self.ws_sim_url = derived.ws_sim_url;
        Ok(self)
    }

    /// Stream endpoint for one subscription
    pub fn stream_url(&self, kind: StreamKind) -> &str {
        match kind {
            StreamKind::Telemetry => &self.ws_url,
            StreamKind::Simulation => &self.ws_sim_url,
            StreamKind::Log => &self.ws_log_url,
        }
    }
}

/// `http://host:port` + `/path` -> `ws://host:port/path`
pub fn derive_ws_url(api_url: &str, path: &str) -> String {
    let base = api_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    };
    format!("{}{}", ws_base, path)
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            ConfigError::InvalidValue(format!("{} has an invalid value: '{}'", key, raw))
        }),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_local_backend() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.api_url, "http://localhost:3000");
        assert_eq!(config.ws_url, "ws://localhost:3000/ws");
        assert_eq!(config.ws_log_url, "ws://localhost:3000/logs");
        assert_eq!(config.ws_sim_url, "ws://localhost:3000/sim/ws");
        assert_eq!(config.reconnect_backoff, Duration::from_secs(1));
        assert_eq!(config.telemetry_capacity, 10_000);
        assert_eq!(config.simulation_capacity, 500);
        assert_eq!(config.edge_impulse_api_key, None);
    }

    #[test]
    fn test_stream_urls_follow_api_url() {
        let config =
            ClientConfig::from_lookup(lookup(&[("ENOSE_API_URL", "https://rig.lab:8443/")]))
                .unwrap();

        assert_eq!(config.api_url, "https://rig.lab:8443");
        assert_eq!(config.stream_url(StreamKind::Telemetry), "wss://rig.lab:8443/ws");
        assert_eq!(config.stream_url(StreamKind::Simulation), "wss://rig.lab:8443/sim/ws");
    }

    #[test]
    fn test_explicit_overrides_win() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("ENOSE_WS_LOG_URL", "ws://10.0.0.2:9000/logs"),
            ("ENOSE_RECONNECT_BACKOFF_MS", "250"),
            ("ENOSE_LOG_CAPACITY", "50"),
            ("EDGE_IMPULSE_API_KEY", "ei_test"),
        ]))
        .unwrap();

        assert_eq!(config.ws_log_url, "ws://10.0.0.2:9000/logs");
        assert_eq!(config.ws_url, "ws://localhost:3000/ws");
        assert_eq!(config.reconnect_backoff, Duration::from_millis(250));
        assert_eq!(config.log_capacity, 50);
        assert_eq!(config.edge_impulse_api_key.as_deref(), Some("ei_test"));
    }

    #[test]
    fn test_api_url_override_rederives_streams() {
        let config = ClientConfig::default()
            .with_api_url("http://192.168.1.40:3000")
            .unwrap();
        assert_eq!(config.ws_sim_url, "ws://192.168.1.40:3000/sim/ws");
        assert!(ClientConfig::default().with_api_url("ftp://rig").is_err());
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(ClientConfig::from_lookup(lookup(&[("ENOSE_TELEMETRY_CAPACITY", "lots")])).is_err());
        assert!(ClientConfig::from_lookup(lookup(&[("ENOSE_RECONNECT_BACKOFF_MS", "0")])).is_err());
        assert!(ClientConfig::from_lookup(lookup(&[("ENOSE_API_URL", "localhost:3000")])).is_err());
    }
}
