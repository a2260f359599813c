// Stream dispatcher: fans deliveries from the connections into buffer sets
// and the log sink.
//
// The dispatcher is the only writer of each buffer set. It never calls into
// rendering code; renderers pull snapshots at their own cadence.

use crate::buffer_set::SharedBufferSet;
use crate::connection::Inbound;
use crate::message::{Payload, Sample};
use crate::types::{DispatchStats, StreamKind};
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Destination for raw backend log lines
pub trait LogSink: Send + Sync {
    fn push_line(&self, line: String);
}

/// Bounded in-memory log sink, newest line last
#[derive(Debug)]
pub struct LogBuffer {
    lines: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().iter().cloned().collect()
    }

    /// Remove and return everything buffered so far
    pub fn drain(&self) -> Vec<String> {
        self.lines.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}

impl LogSink for LogBuffer {
    fn push_line(&self, line: String) {
        if self.capacity == 0 {
            return;
        }
        let mut lines = self.lines.lock();
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }
}

/// Latest device state as reported by telemetry, for status display only
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryStatus {
    pub state: String,
    pub co_mics: f64,
}

impl TelemetryStatus {
    pub fn line(&self) -> String {
        let state = if self.state.is_empty() {
            "UNKNOWN"
        } else {
            self.state.as_str()
        };
        format!("State: {} | CO (MiCS): {:.4}", state, self.co_mics)
    }
}

#[derive(Debug, Default)]
struct Counters {
    telemetry_samples: AtomicU64,
    simulation_samples: AtomicU64,
    log_lines: AtomicU64,
    decode_failures: AtomicU64,
}

pub struct StreamDispatcher {
    telemetry: SharedBufferSet,
    simulation: SharedBufferSet,
    log_sink: Arc<dyn LogSink>,
    status: RwLock<Option<TelemetryStatus>>,
    counters: Counters,
}

impl StreamDispatcher {
    pub fn new(
        telemetry: SharedBufferSet,
        simulation: SharedBufferSet,
        log_sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            telemetry,
            simulation,
            log_sink,
            status: RwLock::new(None),
            counters: Counters::default(),
        }
    }

    /// Route one delivery to its destination
    pub fn route(&self, inbound: Inbound) {
        match inbound {
            Inbound::Payload {
                stream: StreamKind::Telemetry,
                payload: Payload::Sample(sample),
            } => {
                self.update_status(&sample);
                self.telemetry.append_sample(&sample);
                self.counters
                    .telemetry_samples
                    .fetch_add(1, Ordering::Relaxed);
            }
            Inbound::Payload {
                stream: StreamKind::Simulation,
                payload: Payload::Sample(sample),
            } => {
                self.simulation.append_sample(&sample);
                self.counters
                    .simulation_samples
                    .fetch_add(1, Ordering::Relaxed);
            }
            Inbound::Payload {
                stream: StreamKind::Log,
                payload: Payload::Line(line),
            } => {
                self.log_sink.push_line(line);
                self.counters.log_lines.fetch_add(1, Ordering::Relaxed);
            }
            Inbound::Payload { stream, payload } => {
                log::warn!(
                    "Ignoring mismatched payload on {} stream: {:?}",
                    stream,
                    payload
                );
            }
            Inbound::DecodeFailed { stream, error } => {
                self.counters.decode_failures.fetch_add(1, Ordering::Relaxed);
                log::debug!("Decode failure on {} stream: {}", stream, error);
            }
        }
    }

    /// Drain deliveries until every sender is gone or `cancel_token` fires
    pub async fn run(
        self: Arc<Self>,
        mut receiver: mpsc::Receiver<Inbound>,
        cancel_token: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;

                _ = cancel_token.cancelled() => {
                    log::info!("Dispatcher cancelled");
                    break;
                }

                inbound = receiver.recv() => match inbound {
                    Some(inbound) => self.route(inbound),
                    None => {
                        log::info!("Dispatcher channel closed");
                        break;
                    }
                }
            }
        }
    }

    fn update_status(&self, sample: &Sample) {
        if let Some(state) = &sample.state {
            *self.status.write() = Some(TelemetryStatus {
                state: state.clone(),
                co_mics: sample.value("co_mics"),
            });
        }
    }

    pub fn status(&self) -> Option<TelemetryStatus> {
        self.status.read().clone()
    }

    pub fn telemetry(&self) -> &SharedBufferSet {
        &self.telemetry
    }

    pub fn simulation(&self) -> &SharedBufferSet {
        &self.simulation
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            telemetry_samples: self.counters.telemetry_samples.load(Ordering::Relaxed),
            simulation_samples: self.counters.simulation_samples.load(Ordering::Relaxed),
            log_lines: self.counters.log_lines.load(Ordering::Relaxed),
            decode_failures: self.counters.decode_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer_set::BufferSet;
    use crate::surface::SurfaceLayout;

    fn dispatcher() -> (StreamDispatcher, Arc<LogBuffer>) {
        let logs = Arc::new(LogBuffer::new(3));
        let dispatcher = StreamDispatcher::new(
            SharedBufferSet::new(BufferSet::from_layout(&SurfaceLayout::telemetry())),
            SharedBufferSet::new(BufferSet::from_layout(&SurfaceLayout::simulation())),
            logs.clone(),
        );
        (dispatcher, logs)
    }

    fn sample(t: f64, pairs: &[(&str, f64)]) -> Sample {
        Sample::new(t, pairs.iter().map(|(k, v)| (k.to_string(), *v)))
    }

    #[test]
    fn test_routes_samples_by_source_stream() {
        let (dispatcher, _) = dispatcher();

        dispatcher.route(Inbound::Payload {
            stream: StreamKind::Telemetry,
            payload: Payload::Sample(sample(10.0, &[("co_mics", 1.0)])),
        });
        dispatcher.route(Inbound::Payload {
            stream: StreamKind::Simulation,
            payload: Payload::Sample(sample(0.05, &[("x1", 0.3)])),
        });
        dispatcher.route(Inbound::Payload {
            stream: StreamKind::Simulation,
            payload: Payload::Sample(sample(0.10, &[("x1", 0.6)])),
        });

        assert_eq!(dispatcher.telemetry().len(), 1);
        assert_eq!(dispatcher.simulation().len(), 2);

        let stats = dispatcher.stats();
        assert_eq!(stats.telemetry_samples, 1);
        assert_eq!(stats.simulation_samples, 2);
    }

    #[test]
    fn test_log_lines_bypass_buffers_and_keep_order() {
        let (dispatcher, logs) = dispatcher();

        for line in ["one", "two", "three", "four"] {
            dispatcher.route(Inbound::Payload {
                stream: StreamKind::Log,
                payload: Payload::Line(line.to_string()),
            });
        }

        assert_eq!(logs.lines(), vec!["two", "three", "four"]);
        assert!(dispatcher.telemetry().is_empty());
        assert!(dispatcher.simulation().is_empty());
        assert_eq!(dispatcher.stats().log_lines, 4);
    }

    #[test]
    fn test_decode_failures_are_counted_not_buffered() {
        let (dispatcher, logs) = dispatcher();
        dispatcher.route(Inbound::DecodeFailed {
            stream: StreamKind::Telemetry,
            error: "Invalid telemetry JSON".into(),
        });

        assert_eq!(dispatcher.stats().decode_failures, 1);
        assert!(dispatcher.telemetry().is_empty());
        assert!(logs.is_empty());
    }

    #[test]
    fn test_status_line_tracks_latest_telemetry() {
        let (dispatcher, _) = dispatcher();
        assert!(dispatcher.status().is_none());

        let mut s = sample(0.0, &[("co_mics", 0.123456)]);
        s.state = Some("SAMPLING".into());
        dispatcher.route(Inbound::Payload {
            stream: StreamKind::Telemetry,
            payload: Payload::Sample(s),
        });

        assert_eq!(
            dispatcher.status().unwrap().line(),
            "State: SAMPLING | CO (MiCS): 0.1235"
        );
    }

    #[tokio::test]
    async fn test_run_drains_until_senders_drop() {
        let (dispatcher, logs) = dispatcher();
        let dispatcher = Arc::new(dispatcher);
        let (tx, rx) = mpsc::channel(8);

        let task = tokio::spawn(Arc::clone(&dispatcher).run(rx, CancellationToken::new()));
        for i in 0..5 {
            tx.send(Inbound::Payload {
                stream: StreamKind::Log,
                payload: Payload::Line(format!("line {}", i)),
            })
            .await
            .unwrap();
        }
        drop(tx);
        task.await.unwrap();

        assert_eq!(logs.len(), 3);
        assert_eq!(logs.lines().last().map(String::as_str), Some("line 4"));
    }
}
