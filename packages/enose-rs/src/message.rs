// Inbound wire formats and their decoders
//
// Telemetry and simulation frames are JSON text; log frames are raw lines.
// Every decoder either yields exactly one payload or a `StreamError::Decode`;
// nothing partial ever reaches a buffer.

use crate::types::{StreamError, StreamResult, StreamKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Keys of the seven gas channels, in display order
pub const TELEMETRY_CHANNELS: [&str; 7] = [
    "co_mics",
    "eth_mics",
    "voc_mics",
    "no2_gm",
    "c2h5oh_gm",
    "voc_gm",
    "co_gm",
];

/// Keys of the simulation channels, in display order
pub const SIMULATION_CHANNELS: [&str; 3] = ["x1", "x2", "y"];

/// Full telemetry record as published by the backend
///
/// Every field is optional on the wire. Numeric fields default to zero and
/// unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryRecord {
    pub ts: u64,
    pub state: String,
    #[serde(rename = "motor_A_duty")]
    pub motor_a_duty: i32,
    #[serde(rename = "motor_B_duty")]
    pub motor_b_duty: i32,
    pub gmxxx_ch1: u32,
    pub gmxxx_ch2: u32,
    pub gmxxx_ch3: u32,
    pub gmxxx_ch4: u32,
    pub mics5524_raw: u32,
    pub co_mics: f64,
    pub eth_mics: f64,
    pub voc_mics: f64,
    pub no2_gm: f64,
    pub c2h5oh_gm: f64,
    pub voc_gm: f64,
    pub co_gm: f64,
    #[serde(rename = "currentLevel")]
    pub current_level: i32,
}

impl TelemetryRecord {
    /// Value of one of the plotted gas channels, `None` for unknown keys
    pub fn channel(&self, key: &str) -> Option<f64> {
        let value = match key {
            "co_mics" => self.co_mics,
            "eth_mics" => self.eth_mics,
            "voc_mics" => self.voc_mics,
            "no2_gm" => self.no2_gm,
            "c2h5oh_gm" => self.c2h5oh_gm,
            "voc_gm" => self.voc_gm,
            "co_gm" => self.co_gm,
            _ => return None,
        };
        Some(value)
    }

    /// The seven gas channel values in display order
    pub fn channel_values(&self) -> [f64; 7] {
        TELEMETRY_CHANNELS.map(|key| self.channel(key).unwrap_or(0.0))
    }

    pub fn into_sample(self, timestamp: f64) -> Sample {
        let values = TELEMETRY_CHANNELS
            .iter()
            .zip(self.channel_values())
            .map(|(key, value)| (key.to_string(), value))
            .collect();

        Sample {
            timestamp,
            values,
            state: Some(self.state),
        }
    }
}

/// One point from the signal simulator
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationPoint {
    pub time: f64,
    pub x1: f64,
    pub x2: f64,
    pub y: f64,
}

impl SimulationPoint {
    pub fn into_sample(self) -> Sample {
        let values = HashMap::from([
            ("x1".to_string(), self.x1),
            ("x2".to_string(), self.x2),
            ("y".to_string(), self.y),
        ]);

        Sample {
            timestamp: self.time,
            values,
            state: None,
        }
    }
}

/// A decoded sample, immutable once appended
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Seconds. Receipt time for telemetry, simulator time for simulation.
    pub timestamp: f64,
    pub values: HashMap<String, f64>,
    /// Opaque device state string, display only
    pub state: Option<String>,
}

impl Sample {
    pub fn new(timestamp: f64, values: impl IntoIterator<Item = (String, f64)>) -> Self {
        Self {
            timestamp,
            values: values.into_iter().collect(),
            state: None,
        }
    }

    /// Value for `key`, zero when the channel was absent
    pub fn value(&self, key: &str) -> f64 {
        self.values.get(key).copied().unwrap_or(0.0)
    }
}

/// Payload of one inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Sample(Sample),
    Line(String),
}

/// Decoder selected per subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Telemetry,
    Simulation,
    LogLines,
}

impl Codec {
    pub fn for_stream(kind: StreamKind) -> Self {
        match kind {
            StreamKind::Telemetry => Self::Telemetry,
            StreamKind::Simulation => Self::Simulation,
            StreamKind::Log => Self::LogLines,
        }
    }

    /// Decode one text frame. `received_at` stamps telemetry samples.
    pub fn decode(&self, text: &str, received_at: f64) -> StreamResult<Payload> {
        match self {
            Self::Telemetry => {
                let record: TelemetryRecord = serde_json::from_str(text)
                    .map_err(|e| StreamError::Decode(format!("Invalid telemetry JSON: {}", e)))?;
                Ok(Payload::Sample(record.into_sample(received_at)))
            }
            Self::Simulation => {
                let point: SimulationPoint = serde_json::from_str(text)
                    .map_err(|e| StreamError::Decode(format!("Invalid simulation JSON: {}", e)))?;
                if !point.time.is_finite() {
                    return Err(StreamError::Decode("Non-finite simulation time".into()));
                }
                Ok(Payload::Sample(point.into_sample()))
            }
            Self::LogLines => Ok(Payload::Line(text.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_missing_channels_default_to_zero() {
        let payload = Codec::Telemetry
            .decode(r#"{"co_mics": 2.5, "state": "SAMPLING"}"#, 4.0)
            .unwrap();

        let Payload::Sample(sample) = payload else {
            panic!("expected sample");
        };
        assert_eq!(sample.timestamp, 4.0);
        assert_eq!(sample.value("co_mics"), 2.5);
        assert_eq!(sample.value("co_gm"), 0.0);
        assert_eq!(sample.values.len(), 7);
        assert_eq!(sample.state.as_deref(), Some("SAMPLING"));
    }

    #[test]
    fn test_telemetry_full_record_with_renamed_fields() {
        let text = r#"{"ts": 1200, "state": "IDLE", "motor_A_duty": 40, "motor_B_duty": -10,
            "gmxxx_ch1": 1, "gmxxx_ch2": 2, "gmxxx_ch3": 3, "gmxxx_ch4": 4, "mics5524_raw": 512,
            "co_mics": 1.0, "eth_mics": 2.0, "voc_mics": 3.0, "no2_gm": 4.0, "c2h5oh_gm": 5.0,
            "voc_gm": 6.0, "co_gm": 7.0, "currentLevel": 2, "extra": true}"#;
        let record: TelemetryRecord = serde_json::from_str(text).unwrap();

        assert_eq!(record.motor_a_duty, 40);
        assert_eq!(record.current_level, 2);
        assert_eq!(record.channel_values(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_malformed_payloads_are_decode_errors() {
        assert!(matches!(
            Codec::Telemetry.decode("not json", 0.0),
            Err(StreamError::Decode(_))
        ));
        assert!(matches!(
            Codec::Telemetry.decode(r#"{"co_mics": "high"}"#, 0.0),
            Err(StreamError::Decode(_))
        ));
        assert!(matches!(
            Codec::Simulation.decode(r#"{"time": "soon"}"#, 0.0),
            Err(StreamError::Decode(_))
        ));
    }

    #[test]
    fn test_simulation_uses_source_time() {
        let payload = Codec::Simulation
            .decode(r#"{"time": 1.25, "x1": 0.5, "x2": -0.5, "y": 0.0}"#, 99.0)
            .unwrap();

        let Payload::Sample(sample) = payload else {
            panic!("expected sample");
        };
        assert_eq!(sample.timestamp, 1.25);
        assert_eq!(sample.value("x2"), -0.5);
    }

    #[test]
    fn test_log_lines_pass_through_untouched() {
        let line = "[INFO] ▶️ Started sampling: coffee_1700000000";
        assert_eq!(
            Codec::LogLines.decode(line, 0.0).unwrap(),
            Payload::Line(line.to_string())
        );
    }
}
