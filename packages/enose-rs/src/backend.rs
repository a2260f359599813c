// Backend control client
//
// One HTTP request per operator action. Failures are reported once to the
// caller; nothing here retries.

use crate::message::TelemetryRecord;
use crate::types::{CollaboratorError, CollaboratorResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Generic `{success, message}` reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

impl ApiResponse {
    /// The message on success, `Rejected` otherwise
    pub fn into_result(self) -> CollaboratorResult<String> {
        if self.success {
            Ok(self.message)
        } else {
            Err(CollaboratorError::Rejected(self.message))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialPortsResponse {
    pub success: bool,
    #[serde(default)]
    pub ports: Vec<String>,
}

/// One simulator input signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalParams {
    pub amplitude: f64,
    pub frequency: f64,
    /// Degrees
    pub phase: f64,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            amplitude: 1.0,
            frequency: 1.0,
            phase: 0.0,
        }
    }
}

/// How the simulator combines its two signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Operation {
    #[default]
    Add,
    Subtract,
    Multiply,
}

impl std::str::FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "add" => Ok(Self::Add),
            "subtract" | "sub" => Ok(Self::Subtract),
            "multiply" | "mul" => Ok(Self::Multiply),
            other => Err(format!(
                "Unknown operation '{}'. Valid options: add, subtract, multiply",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SimParams {
    pub signal1: SignalParams,
    pub signal2: SignalParams,
    pub operation: Operation,
}

#[derive(Serialize)]
struct PortRequest<'a> {
    port: &'a str,
}

#[derive(Serialize)]
struct LabelRequest<'a> {
    label: &'a str,
}

#[derive(Serialize)]
struct PathRequest<'a> {
    path: &'a str,
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> CollaboratorResult<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn list_serial_ports(&self) -> CollaboratorResult<Vec<String>> {
        let response: SerialPortsResponse = self.get("list_serial_ports").await?;
        if response.success {
            Ok(response.ports)
        } else {
            Err(CollaboratorError::Rejected(
                "Backend could not enumerate serial ports".to_string(),
            ))
        }
    }

    pub async fn connect_serial(&self, port: &str) -> CollaboratorResult<String> {
        self.post_action("connect_serial", Some(&PortRequest { port }))
            .await
    }

    /// Start a sampling session. Returns the backend's sample id.
    pub async fn start_sampling(&self, label: &str) -> CollaboratorResult<String> {
        self.post_action("start", Some(&LabelRequest { label })).await
    }

    pub async fn stop_sampling(&self) -> CollaboratorResult<String> {
        self.post_action::<()>("stop", None).await
    }

    pub async fn reset(&self) -> CollaboratorResult<String> {
        self.post_action::<()>("reset", None).await
    }

    /// Ask the backend to write its session buffer as CSV at `path` on its host
    pub async fn save_csv(&self, path: &str) -> CollaboratorResult<String> {
        self.post_action("save_csv", Some(&PathRequest { path }))
            .await
    }

    /// Ask the backend to write its session buffer as JSON at `path` on its host
    pub async fn save_json(&self, path: &str) -> CollaboratorResult<String> {
        self.post_action("save_json", Some(&PathRequest { path }))
            .await
    }

    pub async fn session_data(&self) -> CollaboratorResult<Vec<TelemetryRecord>> {
        self.get("session_data").await
    }

    pub async fn connect_influx(&self) -> CollaboratorResult<String> {
        self.post_action::<()>("connect_influx", None).await
    }

    pub async fn sim_start(&self) -> CollaboratorResult<String> {
        self.post_action::<()>("sim/start", None).await
    }

    pub async fn sim_stop(&self) -> CollaboratorResult<String> {
        self.post_action::<()>("sim/stop", None).await
    }

    pub async fn sim_params(&self, params: &SimParams) -> CollaboratorResult<String> {
        self.post_action("sim/params", Some(params)).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> CollaboratorResult<T> {
        let url = self.url(path);
        log::debug!("GET {}", url);
        let response = self.http_client.get(&url).send().await?;
        Self::decode(response).await
    }

    async fn post_action<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> CollaboratorResult<String> {
        let url = self.url(path);
        log::debug!("POST {}", url);

        let mut request = self.http_client.post(&url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;

        let reply: ApiResponse = Self::decode(response).await?;
        reply.into_result().inspect_err(|e| {
            log::error!("Backend rejected {}: {}", path, e);
        })
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> CollaboratorResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("Backend returned status {}: {}", status, body);
            return Err(CollaboratorError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_params_wire_shape() {
        let params = SimParams {
            signal1: SignalParams {
                amplitude: 2.0,
                frequency: 0.5,
                phase: 90.0,
            },
            signal2: SignalParams::default(),
            operation: Operation::Multiply,
        };
        let json = serde_json::to_value(params).unwrap();

        assert_eq!(json["signal1"]["phase"], 90.0);
        assert_eq!(json["signal2"]["amplitude"], 1.0);
        assert_eq!(json["operation"], "Multiply");
    }

    #[test]
    fn test_failed_reply_is_rejected() {
        let reply: ApiResponse =
            serde_json::from_str(r#"{"success": false, "message": "InfluxDB unreachable"}"#)
                .unwrap();
        match reply.into_result() {
            Err(CollaboratorError::Rejected(msg)) => assert_eq!(msg, "InfluxDB unreachable"),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_operation_parses_case_insensitively() {
        assert_eq!("SUBTRACT".parse::<Operation>(), Ok(Operation::Subtract));
        assert_eq!("mul".parse::<Operation>(), Ok(Operation::Multiply));
        assert!("divide".parse::<Operation>().is_err());
    }

    #[test]
    fn test_urls_join_without_double_slashes() {
        let client = BackendClient::new("http://localhost:3000/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.url("/sim/start"), "http://localhost:3000/sim/start");
        assert_eq!(client.url("stop"), "http://localhost:3000/stop");
    }
}
