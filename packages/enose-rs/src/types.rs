// Common types shared by the stream, buffer and collaborator layers

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for streaming operations
pub type StreamResult<T> = Result<T, StreamError>;

/// Result type for calls into external collaborators (backend, ingestion, export)
pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// Errors raised on the streaming path
///
/// Transport variants (`Connection`, `WebSocket`, `ChannelClosed`) never
/// escape a running connection: the reconnect loop logs them, records the
/// latest in `ConnectionStats::last_error` and retries. `Decode` is
/// reported per message and never tears the connection down.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Channel closed")]
    ChannelClosed,
}

/// Errors from backend, ingestion and export calls
///
/// These are surfaced once to the operator and never retried automatically.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{0}")]
    Rejected(String),

    #[error("No data to export")]
    EmptySession,

    #[error("Missing configuration: {0}")]
    MissingConfig(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Lifecycle of a single stream connection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(s)
    }
}

/// Which subscription a delivery came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Telemetry,
    Simulation,
    Log,
}

impl StreamKind {
    pub const ALL: [StreamKind; 3] = [Self::Telemetry, Self::Simulation, Self::Log];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Telemetry => "telemetry",
            Self::Simulation => "simulation",
            Self::Log => "log",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters for one connection
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ConnectionStats {
    pub connect_attempts: u64,
    pub sessions_established: u64,
    pub messages_delivered: u64,
    pub decode_failures: u64,
    /// Most recent transport failure, kept across reconnects
    pub last_error: Option<String>,
}

/// Counters for the dispatcher
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DispatchStats {
    pub telemetry_samples: u64,
    pub simulation_samples: u64,
    pub log_lines: u64,
    pub decode_failures: u64,
}
