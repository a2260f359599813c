// Labeled sample upload to the ingestion service
//
// The envelope layout is fixed by the service. The signature is a
// placeholder; the service authenticates with the `x-api-key` header.

use crate::message::{TelemetryRecord, TELEMETRY_CHANNELS};
use crate::types::{CollaboratorError, CollaboratorResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEVICE_NAME: &str = "e-nouse";
pub const DEVICE_TYPE: &str = "ENOSE";
pub const INTERVAL_MS: u32 = 250;
pub const SENSOR_UNITS: &str = "ppm";
pub const DEFAULT_LABEL: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub protected: Protected,
    pub signature: String,
    pub payload: EnvelopePayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Protected {
    pub ver: String,
    pub alg: String,
    /// Unix milliseconds
    pub iat: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopePayload {
    pub device_name: String,
    pub device_type: String,
    pub interval_ms: u32,
    pub sensors: Vec<Sensor>,
    pub values: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub name: String,
    pub units: String,
}

impl Envelope {
    /// Build the envelope for `records`, one row of gas channels per record
    pub fn from_records(records: &[TelemetryRecord], iat_ms: i64) -> Self {
        Self {
            protected: Protected {
                ver: "v1".to_string(),
                alg: "HS256".to_string(),
                iat: iat_ms,
            },
            signature: "signature_placeholder".to_string(),
            payload: EnvelopePayload {
                device_name: DEVICE_NAME.to_string(),
                device_type: DEVICE_TYPE.to_string(),
                interval_ms: INTERVAL_MS,
                sensors: TELEMETRY_CHANNELS
                    .iter()
                    .map(|name| Sensor {
                        name: name.to_string(),
                        units: SENSOR_UNITS.to_string(),
                    })
                    .collect(),
                values: records.iter().map(|r| r.channel_values().to_vec()).collect(),
            },
        }
    }
}

/// Outcome of a successful upload
#[derive(Debug, Clone, PartialEq)]
pub struct UploadReceipt {
    pub file_name: String,
    pub label: String,
    pub samples: usize,
}

#[derive(Debug, Clone)]
pub struct IngestionClient {
    url: String,
    api_key: Option<String>,
    http_client: reqwest::Client,
}

impl IngestionClient {
    pub fn new(url: &str, api_key: Option<String>, timeout: Duration) -> CollaboratorResult<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.to_string(),
            api_key,
            http_client,
        })
    }

    /// Upload one labeled session. An empty label becomes `unknown`.
    pub async fn upload(
        &self,
        label: &str,
        records: &[TelemetryRecord],
    ) -> CollaboratorResult<UploadReceipt> {
        if records.is_empty() {
            return Err(CollaboratorError::EmptySession);
        }
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(CollaboratorError::MissingConfig("EDGE_IMPULSE_API_KEY"))?;

        let now = Utc::now();
        let envelope = Envelope::from_records(records, now.timestamp_millis());
        let file_name = format!("sample_{}.json", now.timestamp());
        let label = if label.trim().is_empty() {
            DEFAULT_LABEL.to_string()
        } else {
            label.to_string()
        };

        log::info!(
            "Uploading {} samples as {} (label: {})",
            records.len(),
            file_name,
            label
        );

        let response = self
            .http_client
            .post(&self.url)
            .header("x-api-key", api_key)
            .header("x-file-name", &file_name)
            .header("x-label", &label)
            .json(&envelope)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("Upload failed with status {}: {}", status, body);
            return Err(CollaboratorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(UploadReceipt {
            file_name,
            label,
            samples: records.len(),
        })
    }
}
