//! WebSocket listener, per-client pumps, and the health listener.
//!
//! The WebSocket listener accepts upgrade requests on every path and
//! answers anything else with a plain 400. The health listener lives on
//! its own port and shares nothing with the data path except the
//! subprocess exit flag, so it stays responsive under load.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;
use axum::extract::State;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use futures_util::{SinkExt, StreamExt};

use crate::events::GatewayEvent;
use crate::jsonrpc::RpcMessage;
use crate::registry::{Client, ClientId};
use crate::writer::ChildStdinWriter;
use tokio::sync::mpsc;

/// Maximum WebSocket frame size accepted from a client (512 KiB).
pub const MAX_FRAME_BYTES: usize = 512 * 1024;

/// Shared state for the WebSocket listener.
#[derive(Clone)]
pub struct WsState {
    pub events: mpsc::Sender<GatewayEvent>,
    pub stdin: ChildStdinWriter,
}

/// Build the WebSocket listener app: upgrades on any path, 400 otherwise.
pub fn ws_app(state: WsState) -> Router {
    Router::new().fallback(upgrade_entry).with_state(state)
}

async fn upgrade_entry(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<WsState>,
) -> Response {
    match ws {
        Ok(upgrade) => upgrade
            .protocols(["mcp"])
            .max_message_size(MAX_FRAME_BYTES)
            .on_upgrade(move |socket| handle_socket(socket, state)),
        Err(_) => (
            StatusCode::BAD_REQUEST,
            "This server only accepts WebSocket connections",
        )
            .into_response(),
    }
}

/// Drive one client connection: register, run both pumps, unregister.
async fn handle_socket(socket: WebSocket, state: WsState) {
    let client_id = ClientId::new();
    let (client, mut outbound) = Client::channel(client_id.clone());
    if state.events.send(GatewayEvent::Register(client)).await.is_err() {
        // Event loop is gone; the gateway is shutting down.
        return;
    }

    let (mut ws_tx, mut ws_rx) = socket.split();

    // Write pump: drains the outbound queue in order. Exits when the
    // queue is closed by unregister or the socket write fails.
    let mut write_pump = tokio::spawn(async move {
        while let Some(payload) = outbound.recv().await {
            if ws_tx.send(WsMessage::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    // Read pump: one frame at a time, parse, forward to the child tagged
    // with this client's id. Any read error or close ends the pump.
    let read_id = client_id.clone();
    let stdin = state.stdin.clone();
    let mut read_pump = tokio::spawn(async move {
        while let Some(Ok(frame)) = ws_rx.next().await {
            match frame {
                WsMessage::Text(text) => {
                    let msg: RpcMessage = match serde_json::from_str(text.as_str()) {
                        Ok(msg) => msg,
                        Err(e) => {
                            tracing::warn!(client_id = %read_id, "failed to parse client message: {e}");
                            continue;
                        }
                    };
                    if stdin.send(&read_id, msg).await.is_err() {
                        // Child stdin closed; the gateway is going down.
                        break;
                    }
                }
                WsMessage::Close(_) => break,
                _ => {}
            }
        }
    });

    // Single teardown path: whichever pump exits first tears the
    // connection down; unregister closes the outbound queue.
    tokio::select! {
        _ = &mut write_pump => read_pump.abort(),
        _ = &mut read_pump => write_pump.abort(),
    }
    let _ = state.events.send(GatewayEvent::Unregister(client_id)).await;
}

/// Build the health listener app.
///
/// `exited` is the supervisor's exit flag; nothing else is shared with
/// the data path.
pub fn health_app(exited: Arc<AtomicBool>) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(exited)
}

async fn health(State(exited): State<Arc<AtomicBool>>) -> Response {
    if exited.load(Ordering::Relaxed) {
        (StatusCode::INTERNAL_SERVER_ERROR, "MCP server not running").into_response()
    } else {
        (StatusCode::OK, "OK").into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn serve(app: Router) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        port
    }

    fn test_ws_state() -> (WsState, mpsc::Receiver<GatewayEvent>) {
        let (events, ev_rx) = mpsc::channel(16);
        let (_pipe, sink) = tokio::io::duplex(4096);
        let (stdin, _task) = ChildStdinWriter::start(sink);
        (WsState { events, stdin }, ev_rx)
    }

    #[tokio::test]
    async fn health_ok_while_server_running() {
        let exited = Arc::new(AtomicBool::new(false));
        let port = serve(health_app(exited)).await;

        let resp = reqwest::get(format!("http://127.0.0.1:{port}/health"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.text().await.unwrap(), "OK");
    }

    #[tokio::test]
    async fn health_fails_after_server_exit() {
        let exited = Arc::new(AtomicBool::new(true));
        let port = serve(health_app(exited)).await;

        let resp = reqwest::get(format!("http://127.0.0.1:{port}/health"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 500);
        assert_eq!(resp.text().await.unwrap(), "MCP server not running");
    }

    #[tokio::test]
    async fn non_upgrade_request_gets_400() {
        let (state, _ev_rx) = test_ws_state();
        let port = serve(ws_app(state)).await;

        let resp = reqwest::get(format!("http://127.0.0.1:{port}/"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);

        // Any path, same answer.
        let resp = reqwest::get(format!("http://127.0.0.1:{port}/health"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
    }
}
