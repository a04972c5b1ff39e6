//! Shared helpers for the integration suites.

#![allow(dead_code, clippy::panic)]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use piine_relay::app_state::AppState;
use piine_relay::domain::RelayHub;
use piine_relay::server;
use piine_relay::ws::messages::Frame;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A relay running on an ephemeral local port.
pub struct TestRelay {
    pub addr: SocketAddr,
    pub state: AppState,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestRelay {
    pub async fn start() -> Self {
        Self::start_with(RelayHub::new()).await
    }

    pub async fn start_with(hub: RelayHub) -> Self {
        let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind failed");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("no local addr");
        };
        let state = AppState::new(hub);
        let (tx, rx) = oneshot::channel::<()>();
        let serve_state = state.clone();
        tokio::spawn(async move {
            let shutdown = async {
                let _ = rx.await;
            };
            let _ = server::serve(listener, serve_state, shutdown).await;
        });
        Self {
            addr,
            state,
            shutdown: Some(tx),
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Opens a raw socket and waits until the hub has registered it, so
    /// sequential connects get sequential ids.
    pub async fn connect(&self) -> WsStream {
        let expected = self.state.hub.session_count().await + 1;
        let Ok((ws, _)) = tokio_tungstenite::connect_async(self.ws_url()).await else {
            panic!("ws connect failed");
        };
        self.wait_for_sessions(expected).await;
        ws
    }

    pub async fn wait_for_sessions(&self, expected: usize) {
        let waited = tokio::time::timeout(Duration::from_secs(5), async {
            while self.state.hub.session_count().await != expected {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        if waited.is_err() {
            panic!(
                "expected {expected} sessions, hub has {}",
                self.state.hub.session_count().await
            );
        }
    }
}

impl Drop for TestRelay {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub async fn send_piine(ws: &mut WsStream) {
    send_text(ws, r#"{"event":"send_piine"}"#).await;
}

pub async fn send_text(ws: &mut WsStream, text: &str) {
    if ws.send(Message::text(text.to_string())).await.is_err() {
        panic!("ws send failed");
    }
}

/// Next text frame from the relay, decoded.
pub async fn next_frame(ws: &mut WsStream) -> Frame {
    let next = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return Frame::parse(text.as_str()).ok(),
                Some(Ok(_)) => continue,
                _ => return None,
            }
        }
    })
    .await;
    match next {
        Ok(Some(frame)) => frame,
        Ok(None) => panic!("relay closed or sent an undecodable frame"),
        Err(_) => panic!("timed out waiting for a frame"),
    }
}

/// Asserts that no text frame arrives within a short window.
pub async fn assert_silent(ws: &mut WsStream) {
    let next = tokio::time::timeout(Duration::from_millis(200), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return Some(text.to_string()),
                Some(Ok(_)) => continue,
                _ => return None,
            }
        }
    })
    .await;
    if let Ok(Some(text)) = next {
        panic!("unexpected frame: {text}");
    }
}
