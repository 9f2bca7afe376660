//! Suggestion channel — persistent duplex WebSocket client.
//!
//! Maintains one connection to the remote pattern-detection service,
//! serializes outbound action/response messages, and dispatches inbound
//! suggestion/confirmation messages to the coordinator. Connection
//! failures trigger reconnection with bounded exponential backoff; after
//! the attempt cap is reached the client stays offline until `connect()`
//! is called again.

pub mod protocol;

pub use protocol::{HookSummary, InboundMessage, OutboundMessage, UserActionReport};

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ChannelConfig;

/// Reconnect delay for a given attempt: `min(base * 2^attempt, cap)`.
pub fn backoff_delay(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let factor = 1u32.checked_shl(attempt.min(20)).unwrap_or(u32::MAX);
    base.checked_mul(factor).map_or(cap, |d| d.min(cap))
}

/// Duplex channel client.
///
/// One session identifier is generated per connection lifetime and baked
/// into the WebSocket path (`{url}/{user_id}/{session_id}`).
pub struct ChannelClient {
    config: ChannelConfig,
    inbound_tx: mpsc::Sender<InboundMessage>,
    state: Mutex<ClientState>,
}

#[derive(Default)]
struct ClientState {
    outbound_tx: Option<mpsc::Sender<OutboundMessage>>,
    session_id: Option<Uuid>,
    task: Option<JoinHandle<()>>,
}

impl ChannelClient {
    /// Create a client. Inbound messages are delivered on `inbound_tx`;
    /// the coordinator consumes the paired receiver.
    pub fn new(config: ChannelConfig, inbound_tx: mpsc::Sender<InboundMessage>) -> Self {
        Self {
            config,
            inbound_tx,
            state: Mutex::new(ClientState::default()),
        }
    }

    /// Start (or restart) the connection loop. Returns the session id
    /// owned by this connection lifetime.
    pub async fn connect(&self) -> Uuid {
        let mut state = self.state.lock().await;

        if let Some(task) = &state.task
            && !task.is_finished()
            && let Some(session_id) = state.session_id
        {
            debug!(%session_id, "Channel already running");
            return session_id;
        }

        let session_id = Uuid::new_v4();
        let (outbound_tx, outbound_rx) = mpsc::channel(self.config.send_buffer);
        let task = tokio::spawn(run_loop(
            self.config.clone(),
            session_id,
            outbound_rx,
            self.inbound_tx.clone(),
        ));

        state.outbound_tx = Some(outbound_tx);
        state.session_id = Some(session_id);
        state.task = Some(task);
        session_id
    }

    /// Queue an outbound message. Failures are logged, never surfaced:
    /// an offline channel drops the message with a warning.
    pub async fn send(&self, message: OutboundMessage) {
        let state = self.state.lock().await;
        match &state.outbound_tx {
            Some(tx) => {
                if tx.send(message).await.is_err() {
                    warn!("Channel is offline; dropping outbound message");
                }
            }
            None => warn!("Channel was never connected; dropping outbound message"),
        }
    }

    /// The session id of the current connection lifetime, if any.
    pub async fn session_id(&self) -> Option<Uuid> {
        self.state.lock().await.session_id
    }

    /// Tear down the connection and stop reconnecting.
    pub async fn disconnect(&self) {
        let mut state = self.state.lock().await;
        state.outbound_tx = None;
        state.session_id = None;
        if let Some(task) = state.task.take() {
            task.abort();
            info!("Channel disconnected");
        }
    }

    /// Wait for the connection loop to stop (reconnect cap reached or
    /// disconnect). Used by tests.
    pub async fn wait_until_stopped(&self) {
        let task = self.state.lock().await.task.take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

async fn run_loop(
    config: ChannelConfig,
    session_id: Uuid,
    mut outbound_rx: mpsc::Receiver<OutboundMessage>,
    inbound_tx: mpsc::Sender<InboundMessage>,
) {
    let url = format!(
        "{}/{}/{}",
        config.url.trim_end_matches('/'),
        config.user_id,
        session_id
    );
    let mut attempt: u32 = 0;

    loop {
        match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                info!(%session_id, "Channel connected");
                attempt = 0;
                match pump(stream, &mut outbound_rx, &inbound_tx).await {
                    PumpExit::Shutdown => return,
                    PumpExit::ConnectionLost => warn!("Channel connection lost"),
                }
            }
            Err(e) => warn!(error = %e, "Channel connect failed"),
        }

        if attempt >= config.max_reconnect_attempts {
            warn!(
                attempts = attempt,
                "Reconnect cap reached; channel stays offline until connect() is called again"
            );
            return;
        }

        let delay = backoff_delay(attempt, config.reconnect_base, config.reconnect_cap);
        debug!(attempt, delay_ms = delay.as_millis() as u64, "Scheduling reconnect");
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

enum PumpExit {
    /// Caller asked for shutdown (outbound sender dropped).
    Shutdown,
    /// The socket failed or closed; caller decides whether to reconnect.
    ConnectionLost,
}

async fn pump(
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    outbound_rx: &mut mpsc::Receiver<OutboundMessage>,
    inbound_tx: &mpsc::Sender<InboundMessage>,
) -> PumpExit {
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            outbound = outbound_rx.recv() => {
                let Some(message) = outbound else {
                    let _ = write.send(Message::Close(None)).await;
                    return PumpExit::Shutdown;
                };
                match serde_json::to_string(&message) {
                    Ok(json) => {
                        if let Err(e) = write.send(Message::Text(json.into())).await {
                            warn!(error = %e, "Channel send failed");
                            return PumpExit::ConnectionLost;
                        }
                    }
                    Err(e) => warn!(error = %e, "Failed to serialize outbound message"),
                }
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        dispatch(text.as_str(), inbound_tx).await;
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_))) => {}
                    Some(Ok(Message::Close(_))) | None => return PumpExit::ConnectionLost,
                    Some(Err(e)) => {
                        warn!(error = %e, "Channel read failed");
                        return PumpExit::ConnectionLost;
                    }
                }
            }
        }
    }
}

/// Parse and forward one inbound frame. Malformed or unknown frames are
/// logged and dropped.
async fn dispatch(text: &str, inbound_tx: &mpsc::Sender<InboundMessage>) {
    match protocol::parse_inbound(text) {
        Ok(Some(message)) => {
            if inbound_tx.send(message).await.is_err() {
                debug!("Inbound consumer dropped; discarding message");
            }
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, "Dropping malformed inbound message"),
    }
}
