// Stream connection: one standing WebSocket subscription
//
// Each connection runs as its own task and hands every decoded message to
// the dispatcher over a bounded channel, in receipt order.
//
// Reconnect policy: after any failure to connect, any transport error or an
// unexpected close, wait one fixed backoff interval and try again, forever.
// There is no retry cap and no exponential growth; the link is a local
// control-plane connection and the backend is expected to come back.
// Only `stop()` ends the loop, and it unwinds any pending connect, read,
// send or backoff wait promptly.

use crate::message::{Codec, Payload};
use crate::types::{ConnectionState, ConnectionStats, StreamError, StreamKind, StreamResult};
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// What a connection hands to the dispatcher
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Payload { stream: StreamKind, payload: Payload },
    DecodeFailed { stream: StreamKind, error: String },
}

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub kind: StreamKind,
    pub url: String,
    pub backoff: Duration,
}

impl ConnectionConfig {
    pub fn new(kind: StreamKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            backoff: DEFAULT_BACKOFF,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    fn validate(&self) -> StreamResult<()> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(StreamError::InvalidConfig(format!(
                "{} stream URL must use ws:// or wss://, got '{}'",
                self.kind, self.url
            )));
        }
        if self.backoff.is_zero() {
            return Err(StreamError::InvalidConfig(format!(
                "{} stream backoff must be non-zero",
                self.kind
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Counters {
    connect_attempts: AtomicU64,
    sessions_established: AtomicU64,
    messages_delivered: AtomicU64,
    decode_failures: AtomicU64,
    last_error: RwLock<Option<String>>,
}

impl Counters {
    fn snapshot(&self) -> ConnectionStats {
        ConnectionStats {
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            sessions_established: self.sessions_established.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            last_error: self.last_error.read().clone(),
        }
    }
}

/// Why a connected session ended
enum SessionEnd {
    Cancelled,
    ReceiverGone,
    Closed,
    Failed(StreamError),
}

/// Handle to a running connection task
pub struct StreamConnection {
    kind: StreamKind,
    url: String,
    state: Arc<RwLock<ConnectionState>>,
    counters: Arc<Counters>,
    cancel_token: CancellationToken,
    join_handle: Option<JoinHandle<()>>,
}

impl StreamConnection {
    /// Spawn the subscription task on the current runtime
    pub fn spawn(config: ConnectionConfig, sender: mpsc::Sender<Inbound>) -> StreamResult<Self> {
        config.validate()?;

        let state = Arc::new(RwLock::new(ConnectionState::Disconnected));
        let counters = Arc::new(Counters::default());
        let cancel_token = CancellationToken::new();

        let worker = Worker {
            codec: Codec::for_stream(config.kind),
            config: config.clone(),
            sender,
            state: Arc::clone(&state),
            counters: Arc::clone(&counters),
            cancel_token: cancel_token.clone(),
            epoch: Instant::now(),
        };

        let join_handle = tokio::spawn(worker.run());

        Ok(Self {
            kind: config.kind,
            url: config.url,
            state,
            counters,
            cancel_token,
            join_handle: Some(join_handle),
        })
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub fn stats(&self) -> ConnectionStats {
        self.counters.snapshot()
    }

    /// Request a stop. Safe to call from any thread; `Disconnected` becomes
    /// terminal for this instance.
    pub fn stop(&self) {
        self.cancel_token.cancel();
    }

    /// Token that stops this connection when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join_handle
            .as_ref()
            .map(|h| h.is_finished())
            .unwrap_or(true)
    }

    /// Stop and wait for the task to release its transport
    pub async fn shutdown(&mut self) {
        self.stop();
        if let Some(handle) = self.join_handle.take() {
            if let Err(e) = handle.await {
                log::error!("{} connection task failed: {}", self.kind, e);
            }
        }
    }
}

impl Drop for StreamConnection {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

struct Worker {
    config: ConnectionConfig,
    codec: Codec,
    sender: mpsc::Sender<Inbound>,
    state: Arc<RwLock<ConnectionState>>,
    counters: Arc<Counters>,
    cancel_token: CancellationToken,
    /// Receipt times are seconds since this instant
    epoch: Instant,
}

impl Worker {
    async fn run(self) {
        let kind = self.config.kind;
        let mut consecutive_failures: u64 = 0;

        log::info!("Starting {} stream: {}", kind, self.config.url);

        loop {
            self.set_state(ConnectionState::Connecting);
            self.counters.connect_attempts.fetch_add(1, Ordering::Relaxed);

            let connected = tokio::select! {
                biased;

                _ = self.cancel_token.cancelled() => break,

                result = connect_async(self.config.url.as_str()) => result,
            };

            match connected {
                Ok((ws_stream, _)) => {
                    consecutive_failures = 0;
                    self.set_state(ConnectionState::Connected);
                    self.counters
                        .sessions_established
                        .fetch_add(1, Ordering::Relaxed);
                    log::info!("{} stream connected", kind);

                    match self.pump(ws_stream).await {
                        SessionEnd::Cancelled => break,
                        SessionEnd::ReceiverGone => {
                            self.record_failure(StreamError::ChannelClosed);
                            log::warn!("{} stream stopping: {}", kind, StreamError::ChannelClosed);
                            break;
                        }
                        SessionEnd::Closed => {
                            log::info!("{} stream closed by server", kind);
                        }
                        SessionEnd::Failed(e) => {
                            log::warn!("{} stream: {}", kind, e);
                            self.record_failure(e);
                        }
                    }
                }
                Err(e) => {
                    let error = StreamError::Connection(e.to_string());
                    consecutive_failures += 1;
                    if consecutive_failures == 1 {
                        log::warn!("{} stream: {}", kind, error);
                    } else {
                        log::debug!(
                            "{} stream attempt {}: {}",
                            kind,
                            consecutive_failures,
                            error
                        );
                    }
                    self.record_failure(error);
                }
            }

            self.set_state(ConnectionState::Disconnected);

            log::debug!(
                "{} stream reconnecting in {:?}",
                kind,
                self.config.backoff
            );
            tokio::select! {
                biased;

                _ = self.cancel_token.cancelled() => break,

                _ = tokio::time::sleep(self.config.backoff) => {}
            }
        }

        self.set_state(ConnectionState::Disconnected);
        log::info!("{} stream stopped", kind);
    }

    async fn pump(&self, ws_stream: WsStream) -> SessionEnd {
        let (mut write, mut read) = ws_stream.split();

        let end = loop {
            let message = tokio::select! {
                biased;

                _ = self.cancel_token.cancelled() => break SessionEnd::Cancelled,

                message = read.next() => message,
            };

            let delivered = match message {
                Some(Ok(Message::Text(text))) => self.deliver(text.as_str()).await,
                Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                    Ok(text) => self.deliver(text).await,
                    Err(e) => {
                        self.report_decode_failure(format!("Binary frame is not UTF-8: {}", e))
                            .await
                    }
                },
                Some(Ok(Message::Close(_))) | None => break SessionEnd::Closed,
                Some(Ok(_)) => continue,
                Some(Err(e)) => break SessionEnd::Failed(StreamError::WebSocket(e.to_string())),
            };

            if let Err(end) = delivered {
                break end;
            }
        };

        // Best-effort close handshake, bounded so stop never outlives one
        // backoff interval
        if matches!(end, SessionEnd::Cancelled | SessionEnd::ReceiverGone) {
            let close = async {
                let _ = write.send(Message::Close(None)).await;
                let _ = write.close().await;
            };
            if tokio::time::timeout(self.config.backoff, close).await.is_err() {
                log::debug!("{} stream close handshake timed out", self.config.kind);
            }
        }

        end
    }

    async fn deliver(&self, text: &str) -> Result<(), SessionEnd> {
        let received_at = self.epoch.elapsed().as_secs_f64();

        match self.codec.decode(text, received_at) {
            Ok(payload) => {
                self.send(Inbound::Payload {
                    stream: self.config.kind,
                    payload,
                })
                .await?;
                self.counters
                    .messages_delivered
                    .fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => self.report_decode_failure(e.to_string()).await,
        }
    }

    async fn report_decode_failure(&self, error: String) -> Result<(), SessionEnd> {
        self.counters.decode_failures.fetch_add(1, Ordering::Relaxed);
        log::warn!("Dropping {} message: {}", self.config.kind, error);
        self.send(Inbound::DecodeFailed {
            stream: self.config.kind,
            error,
        })
        .await
    }

    async fn send(&self, inbound: Inbound) -> Result<(), SessionEnd> {
        tokio::select! {
            biased;

            _ = self.cancel_token.cancelled() => Err(SessionEnd::Cancelled),

            result = self.sender.send(inbound) => result.map_err(|_| SessionEnd::ReceiverGone),
        }
    }

    fn record_failure(&self, error: StreamError) {
        *self.counters.last_error.write() = Some(error.to_string());
    }

    fn set_state(&self, state: ConnectionState) {
        let mut current = self.state.write();
        if *current != state {
            log::debug!("{} stream {} -> {}", self.config.kind, *current, state);
            *current = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_websocket_urls() {
        let config = ConnectionConfig::new(StreamKind::Telemetry, "http://localhost:3000/ws");
        assert!(matches!(
            config.validate(),
            Err(StreamError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_zero_backoff() {
        let config = ConnectionConfig::new(StreamKind::Log, "ws://localhost:3000/logs")
            .with_backoff(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_stop_before_first_attempt_completes() {
        let (tx, _rx) = mpsc::channel(4);
        let mut connection = StreamConnection::spawn(
            ConnectionConfig::new(StreamKind::Simulation, "ws://127.0.0.1:9/sim/ws"),
            tx,
        )
        .unwrap();

        connection.stop();
        tokio::time::timeout(DEFAULT_BACKOFF, connection.shutdown())
            .await
            .expect("connection did not unwind within one backoff interval");

        assert!(connection.is_finished());
        assert_eq!(connection.state(), ConnectionState::Disconnected);
    }
}
