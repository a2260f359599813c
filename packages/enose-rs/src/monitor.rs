// Monitor: wires the three stream connections, the dispatcher and both
// buffer sets together, and exposes the render-tick API.
//
// Renderers call `frame()` at their own cadence. Each call takes one
// snapshot and transforms it under the parameters current at that moment,
// so a parameter change shows up on the next frame without touching the
// buffers.

use crate::backend::BackendClient;
use crate::buffer_set::{BufferSet, BufferSetMetrics, SharedBufferSet};
use crate::config::ClientConfig;
use crate::connection::{ConnectionConfig, Inbound, StreamConnection};
use crate::dispatcher::{LogBuffer, StreamDispatcher};
use crate::display::{self, DisplayError, DisplayFrame, DisplayParams};
use crate::spacing;
use crate::surface::{Surface, SurfaceLayout};
use crate::types::{
    CollaboratorResult, ConnectionState, ConnectionStats, DispatchStats, StreamKind, StreamResult,
};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Bound on deliveries waiting for the dispatcher
const INBOUND_QUEUE: usize = 1024;

const IDLE_STATUS: &str = "State: IDLE";

struct Running {
    connections: Vec<StreamConnection>,
    dispatcher_task: JoinHandle<()>,
    cancel_token: CancellationToken,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorStats {
    pub dispatch: DispatchStats,
    pub connections: Vec<(StreamKind, ConnectionStats)>,
    pub telemetry: BufferSetMetrics,
    pub simulation: BufferSetMetrics,
}

pub struct Monitor {
    config: ClientConfig,
    telemetry_layout: SurfaceLayout,
    simulation_layout: SurfaceLayout,
    telemetry_params: RwLock<DisplayParams>,
    simulation_params: RwLock<DisplayParams>,
    logs: Arc<LogBuffer>,
    dispatcher: Arc<StreamDispatcher>,
    running: Mutex<Option<Running>>,
}

impl Monitor {
    pub fn new(config: ClientConfig) -> Self {
        let telemetry_layout = SurfaceLayout::telemetry_with_capacity(config.telemetry_capacity);
        let simulation_layout =
            SurfaceLayout::simulation_with_capacity(config.simulation_capacity);
        let logs = Arc::new(LogBuffer::new(config.log_capacity));

        let dispatcher = Arc::new(StreamDispatcher::new(
            SharedBufferSet::new(BufferSet::from_layout(&telemetry_layout)),
            SharedBufferSet::new(BufferSet::from_layout(&simulation_layout)),
            logs.clone(),
        ));

        Self {
            telemetry_params: RwLock::new(telemetry_layout.default_params),
            simulation_params: RwLock::new(simulation_layout.default_params),
            telemetry_layout,
            simulation_layout,
            logs,
            dispatcher,
            running: Mutex::new(None),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Spawn all three connections and the dispatcher on the current
    /// runtime. Calling it again while running is a no-op.
    pub fn start(&self) -> StreamResult<()> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Ok(());
        }

        let (sender, receiver) = mpsc::channel::<Inbound>(INBOUND_QUEUE);
        let cancel_token = CancellationToken::new();

        let mut connections = Vec::with_capacity(StreamKind::ALL.len());
        for kind in StreamKind::ALL {
            let config = ConnectionConfig::new(kind, self.config.stream_url(kind))
                .with_backoff(self.config.reconnect_backoff);
            match StreamConnection::spawn(config, sender.clone()) {
                Ok(connection) => connections.push(connection),
                Err(e) => {
                    for connection in &connections {
                        connection.stop();
                    }
                    return Err(e);
                }
            }
        }
        drop(sender);

        let dispatcher_task = tokio::spawn(
            Arc::clone(&self.dispatcher).run(receiver, cancel_token.child_token()),
        );

        log::info!("Monitor started");
        *running = Some(Running {
            connections,
            dispatcher_task,
            cancel_token,
        });
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Stop every connection, then the dispatcher, and wait for all of them
    pub async fn stop(&self) {
        let running = self.running.lock().take();
        let Some(mut running) = running else {
            return;
        };

        for connection in &running.connections {
            connection.stop();
        }
        for connection in &mut running.connections {
            connection.shutdown().await;
        }

        // Connections are gone, so the dispatcher drains what is queued and
        // sees the channel close. The token covers a wedged receiver.
        if tokio::time::timeout(self.config.reconnect_backoff, &mut running.dispatcher_task)
            .await
            .is_err()
        {
            running.cancel_token.cancel();
            if let Err(e) = running.dispatcher_task.await {
                log::error!("Dispatcher task failed: {}", e);
            }
        }

        log::info!("Monitor stopped");
    }

    pub fn layout(&self, surface: Surface) -> &SurfaceLayout {
        match surface {
            Surface::Telemetry => &self.telemetry_layout,
            Surface::Simulation => &self.simulation_layout,
        }
    }

    pub fn buffers(&self, surface: Surface) -> &SharedBufferSet {
        match surface {
            Surface::Telemetry => self.dispatcher.telemetry(),
            Surface::Simulation => self.dispatcher.simulation(),
        }
    }

    fn params_lock(&self, surface: Surface) -> &RwLock<DisplayParams> {
        match surface {
            Surface::Telemetry => &self.telemetry_params,
            Surface::Simulation => &self.simulation_params,
        }
    }

    pub fn params(&self, surface: Surface) -> DisplayParams {
        *self.params_lock(surface).read()
    }

    /// Snapshot one surface and transform it for display
    pub fn frame(&self, surface: Surface) -> DisplayFrame {
        let params = self.params(surface);
        let snapshot = self.buffers(surface).snapshot();
        display::transform(&snapshot, &params)
    }

    pub fn set_gain(&self, surface: Surface, gain: f64) -> Result<(), DisplayError> {
        let mut params = self.params_lock(surface).write();
        DisplayParams::new(gain, params.spacing)?;
        params.gain = gain;
        Ok(())
    }

    pub fn set_spacing(&self, surface: Surface, spacing: f64) -> Result<(), DisplayError> {
        let mut params = self.params_lock(surface).write();
        DisplayParams::new(params.gain, spacing)?;
        params.spacing = spacing;
        Ok(())
    }

    /// Estimate spacing from the current contents and apply it
    ///
    /// Leaves spacing unchanged and returns `None` when every channel is
    /// flat or empty.
    pub fn auto_space(&self, surface: Surface) -> Option<f64> {
        let snapshot = self.buffers(surface).snapshot();
        let mut params = self.params_lock(surface).write();
        let spacing = spacing::estimate(&snapshot, params.gain)?;
        params.spacing = spacing;
        log::info!("Auto-Spacing set to: {:.2}", spacing);
        Some(spacing)
    }

    /// Clear one surface's buffers
    pub fn reset(&self, surface: Surface) {
        self.buffers(surface).reset();
        log::debug!("{} buffers reset", surface);
    }

    /// Start a backend sampling session and clear the telemetry surface
    pub async fn start_sampling(
        &self,
        backend: &BackendClient,
        label: &str,
    ) -> CollaboratorResult<String> {
        let sample_id = backend.start_sampling(label).await?;
        self.reset(Surface::Telemetry);
        Ok(sample_id)
    }

    /// Reset the backend and clear the telemetry surface
    pub async fn reset_system(&self, backend: &BackendClient) -> CollaboratorResult<String> {
        let message = backend.reset().await?;
        self.reset(Surface::Telemetry);
        Ok(message)
    }

    /// Start the simulator and clear the simulation surface
    pub async fn start_simulation(&self, backend: &BackendClient) -> CollaboratorResult<String> {
        let message = backend.sim_start().await?;
        self.reset(Surface::Simulation);
        Ok(message)
    }

    pub fn connection_states(&self) -> Vec<(StreamKind, ConnectionState)> {
        match self.running.lock().as_ref() {
            Some(running) => running
                .connections
                .iter()
                .map(|c| (c.kind(), c.state()))
                .collect(),
            None => StreamKind::ALL
                .iter()
                .map(|&kind| (kind, ConnectionState::Disconnected))
                .collect(),
        }
    }

    /// Human-readable device status from the latest telemetry
    pub fn status_line(&self) -> String {
        self.dispatcher
            .status()
            .map(|status| status.line())
            .unwrap_or_else(|| IDLE_STATUS.to_string())
    }

    /// Retained backend log lines, oldest first
    pub fn log_lines(&self) -> Vec<String> {
        self.logs.lines()
    }

    /// Take the log lines received since the last call
    pub fn drain_log_lines(&self) -> Vec<String> {
        self.logs.drain()
    }

    pub fn stats(&self) -> MonitorStats {
        let connections = match self.running.lock().as_ref() {
            Some(running) => running
                .connections
                .iter()
                .map(|c| (c.kind(), c.stats()))
                .collect(),
            None => Vec::new(),
        };

        MonitorStats {
            dispatch: self.dispatcher.stats(),
            connections,
            telemetry: self.dispatcher.telemetry().metrics(),
            simulation: self.dispatcher.simulation().metrics(),
        }
    }

    /// Feed one delivery straight to the dispatcher, bypassing connections
    pub fn ingest(&self, inbound: Inbound) {
        self.dispatcher.route(inbound);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Payload, Sample};
    use std::time::Duration;

    fn telemetry(t: f64, co: f64, eth: f64) -> Inbound {
        Inbound::Payload {
            stream: StreamKind::Telemetry,
            payload: Payload::Sample(Sample::new(
                t,
                [("co_mics".to_string(), co), ("eth_mics".to_string(), eth)],
            )),
        }
    }

    #[test]
    fn test_default_params_per_surface() {
        let monitor = Monitor::new(ClientConfig::default());
        assert_eq!(monitor.params(Surface::Telemetry).spacing, 100.0);
        assert_eq!(monitor.params(Surface::Simulation).spacing, 0.0);
        assert_eq!(monitor.status_line(), "State: IDLE");
    }

    #[test]
    fn test_parameter_changes_apply_to_next_frame() {
        let monitor = Monitor::new(ClientConfig::default());
        monitor.ingest(telemetry(0.0, 2.0, 0.0));
        monitor.ingest(telemetry(1.0, 5.0, 0.0));

        let before = monitor.frame(Surface::Telemetry);
        monitor.set_gain(Surface::Telemetry, 2.0).unwrap();
        let after = monitor.frame(Surface::Telemetry);

        // co_mics is index 0 of 7: offset 6 * 100
        assert_eq!(before.values("co_mics").unwrap(), vec![600.0, 603.0]);
        assert_eq!(after.values("co_mics").unwrap(), vec![600.0, 606.0]);
    }

    #[test]
    fn test_invalid_parameters_leave_state_untouched() {
        let monitor = Monitor::new(ClientConfig::default());
        assert!(monitor.set_gain(Surface::Telemetry, -1.0).is_err());
        assert!(monitor.set_spacing(Surface::Telemetry, f64::INFINITY).is_err());
        assert_eq!(
            monitor.params(Surface::Telemetry),
            DisplayParams {
                gain: 1.0,
                spacing: 100.0
            }
        );
    }

    #[test]
    fn test_auto_space_uses_widest_channel() {
        let monitor = Monitor::new(ClientConfig::default());
        assert_eq!(monitor.auto_space(Surface::Telemetry), None);
        assert_eq!(monitor.params(Surface::Telemetry).spacing, 100.0);

        monitor.ingest(telemetry(0.0, 0.0, 5.0));
        monitor.ingest(telemetry(1.0, 10.0, 5.0));
        monitor.set_gain(Surface::Telemetry, 2.0).unwrap();

        let spacing = monitor.auto_space(Surface::Telemetry).unwrap();
        assert!((spacing - 24.0).abs() < 1e-9);
        assert_eq!(monitor.params(Surface::Telemetry).spacing, spacing);
    }

    #[test]
    fn test_reset_only_touches_one_surface() {
        let monitor = Monitor::new(ClientConfig::default());
        monitor.ingest(telemetry(0.0, 1.0, 1.0));
        monitor.ingest(Inbound::Payload {
            stream: StreamKind::Simulation,
            payload: Payload::Sample(Sample::new(0.1, [("y".to_string(), 1.0)])),
        });

        monitor.reset(Surface::Telemetry);
        assert!(monitor.buffers(Surface::Telemetry).is_empty());
        assert_eq!(monitor.buffers(Surface::Simulation).len(), 1);
    }

    #[tokio::test]
    async fn test_start_stop_against_unreachable_backend() {
        let mut config = ClientConfig::for_api_url("http://127.0.0.1:9");
        config.reconnect_backoff = Duration::from_millis(100);
        let monitor = Monitor::new(config);

        monitor.start().unwrap();
        monitor.start().unwrap();
        assert!(monitor.is_running());
        assert_eq!(monitor.connection_states().len(), 3);

        tokio::time::timeout(Duration::from_secs(2), monitor.stop())
            .await
            .expect("monitor did not stop in time");

        assert!(!monitor.is_running());
        assert!(monitor
            .connection_states()
            .iter()
            .all(|(_, state)| *state == ConnectionState::Disconnected));
    }
}
