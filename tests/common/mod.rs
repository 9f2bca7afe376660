//! Mock suggestion service for integration tests: an axum WebSocket
//! server at `/ws/{user_id}/{session_id}` that records every frame the
//! client sends and can push frames back.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::any;
use tokio::sync::{Mutex, broadcast};

#[derive(Clone)]
pub struct MockService {
    received: Arc<Mutex<Vec<serde_json::Value>>>,
    connections: Arc<Mutex<Vec<(String, String)>>>,
    push_tx: broadcast::Sender<String>,
    /// When set, connections are accepted and immediately closed.
    reject_clients: Arc<AtomicBool>,
}

impl MockService {
    /// Every JSON frame received so far, in arrival order.
    pub async fn received(&self) -> Vec<serde_json::Value> {
        self.received.lock().await.clone()
    }

    /// `(user_id, session_id)` pairs of every accepted connection.
    pub async fn connections(&self) -> Vec<(String, String)> {
        self.connections.lock().await.clone()
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.lock().await.len()
    }

    /// Push one raw text frame to every connected client.
    pub fn push_raw(&self, frame: &str) {
        let _ = self.push_tx.send(frame.to_string());
    }

    /// Push one JSON frame to every connected client.
    pub fn push(&self, frame: serde_json::Value) {
        self.push_raw(&frame.to_string());
    }

    /// Make the server drop every connection as soon as it is accepted.
    pub fn reject_clients(&self, reject: bool) {
        self.reject_clients.store(reject, Ordering::SeqCst);
    }

    /// Poll until `predicate` holds, panicking after ~5s.
    pub async fn wait_for_received<F>(&self, predicate: F) -> Vec<serde_json::Value>
    where
        F: Fn(&[serde_json::Value]) -> bool,
    {
        for _ in 0..100 {
            let frames = self.received().await;
            if predicate(&frames) {
                return frames;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!(
            "mock service never received the expected frames; got {:?}",
            self.received().await
        );
    }

    /// Poll until at least `count` connections were accepted.
    pub async fn wait_for_connections(&self, count: usize) {
        for _ in 0..100 {
            if self.connection_count().await >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!(
            "mock service saw {} connections, expected {count}",
            self.connection_count().await
        );
    }
}

/// Bind a mock service on an ephemeral port. Returns the base URL the
/// client should be configured with (it appends `/{user_id}/{session_id}`).
pub async fn start_mock_service() -> (String, MockService) {
    let (push_tx, _) = broadcast::channel(64);
    let service = MockService {
        received: Arc::new(Mutex::new(Vec::new())),
        connections: Arc::new(Mutex::new(Vec::new())),
        push_tx,
        reject_clients: Arc::new(AtomicBool::new(false)),
    };

    let app = Router::new()
        .route("/ws/{user_id}/{session_id}", any(ws_handler))
        .with_state(service.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock service");
    let addr = listener.local_addr().expect("mock service addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    (format!("ws://{addr}/ws"), service)
}

async fn ws_handler(
    Path((user_id, session_id)): Path<(String, String)>,
    State(service): State<MockService>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, service, user_id, session_id))
}

async fn handle_socket(
    mut socket: WebSocket,
    service: MockService,
    user_id: String,
    session_id: String,
) {
    service
        .connections
        .lock()
        .await
        .push((user_id, session_id));

    if service.reject_clients.load(Ordering::SeqCst) {
        return;
    }

    let mut push_rx = service.push_tx.subscribe();
    loop {
        tokio::select! {
            frame = socket.recv() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let value = serde_json::from_str(text.as_str())
                            .unwrap_or(serde_json::Value::Null);
                        service.received.lock().await.push(value);
                    }
                    Some(Ok(Message::Close(_))) | None => return,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => return,
                }
            }
            pushed = push_rx.recv() => {
                let Ok(text) = pushed else { continue };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    return;
                }
            }
        }
    }
}
