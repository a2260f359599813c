// Streaming client core for the E-Nouse sensor rig
//
// Subscribes to the backend's telemetry, simulation and log streams, keeps a
// bounded window of every channel in memory, and turns that window into
// stacked, gain-scaled series ready to draw.
//
// Architecture:
// - `connection`: one reconnecting WebSocket subscription per stream
// - `dispatcher`: routes deliveries to buffer sets and the log sink
// - `buffer` / `buffer_set`: bounded per-channel windows with O(1) min/max
// - `display` / `spacing`: baseline, gain and stacking transform; auto-spacing
// - `monitor`: lifecycle and the render-tick API
// - `backend` / `ingestion` / `export`: one-shot collaborator calls

pub mod backend;
pub mod buffer;
pub mod buffer_set;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod display;
pub mod export;
pub mod ingestion;
pub mod message;
pub mod monitor;
pub mod spacing;
pub mod surface;
pub mod types;

pub use backend::{BackendClient, Operation, SignalParams, SimParams};
pub use buffer::ChannelRingBuffer;
pub use buffer_set::{BufferSet, BufferSnapshot, SharedBufferSet, TimeAxis};
pub use config::{ClientConfig, ConfigError};
pub use connection::{ConnectionConfig, Inbound, StreamConnection};
pub use dispatcher::{LogBuffer, LogSink, StreamDispatcher};
pub use display::{DisplayError, DisplayFrame, DisplayParams, DisplaySeries};
pub use ingestion::IngestionClient;
pub use message::{Payload, Sample, SimulationPoint, TelemetryRecord};
pub use monitor::{Monitor, MonitorStats};
pub use surface::{Surface, SurfaceLayout};
pub use types::{
    CollaboratorError, CollaboratorResult, ConnectionState, StreamError, StreamKind, StreamResult,
};
