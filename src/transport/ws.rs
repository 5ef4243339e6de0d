//! WebSocket adapter — browser-facing clients.
//!
//! DESIGN
//! ======
//! axum owns the HTTP-upgrade handshake and the frame codec; this adapter
//! only sees decoded text payloads. Those feed the engine exactly as the
//! TCP adapter feeds raw bytes, so the same newline framing applies
//! *inside* the payload stream. Outbound payloads go back out wrapped in
//! text frames, and a decode failure closes just this connection.

use std::net::SocketAddr;

use axum::Router;
use axum::extract::State;
use axum::extract::connect_info::ConnectInfo;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use tokio::sync::mpsc;
use tracing::warn;

use crate::engine::{Event, OUTBOUND_QUEUE_DEPTH, Outbound};
use crate::protocol::{self, reason};

/// Handler context: the mux name for tag construction plus the engine's
/// event channel.
#[derive(Clone)]
pub struct WsContext {
    pub name: String,
    pub events: mpsc::Sender<Event>,
}

/// Router serving the WebSocket endpoint at `/`.
pub fn app(context: WsContext) -> Router {
    Router::new().route("/", get(handle_ws)).with_state(context)
}

async fn handle_ws(
    State(context): State<WsContext>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, context, peer))
}

async fn run_ws(mut socket: WebSocket, context: WsContext, peer: SocketAddr) {
    let tag = protocol::connection_tag(&context.name, peer);
    let (writer, mut outbound) = mpsc::channel::<Outbound>(OUTBOUND_QUEUE_DEPTH);
    let open = Event::Open { tag: tag.clone(), address: peer.ip().to_string(), writer };
    if context.events.send(open).await.is_err() {
        return;
    }

    // `Some(why)` is a transport-originated close to report; `None` means
    // the engine commanded the close and already settled the registry.
    let why = loop {
        tokio::select! {
            received = socket.recv() => match received {
                None => break Some(reason::EOF),
                Some(Err(e)) => {
                    warn!(%tag, error = %e, "websocket decode failed");
                    break Some(reason::PARSE_ERROR);
                }
                Some(Ok(Message::Text(text))) => {
                    let data = Event::Data { tag: tag.clone(), chunk: text.as_bytes().to_vec() };
                    if context.events.send(data).await.is_err() {
                        return;
                    }
                }
                Some(Ok(Message::Close(_))) => break Some(reason::EOF),
                // binary and ping/pong frames carry no line traffic
                Some(Ok(_)) => {}
            },
            command = outbound.recv() => match command {
                Some(Outbound::Deliver(payload)) => {
                    if socket.send(Message::Text(payload.into())).await.is_err() {
                        break Some(reason::SEND_ERROR);
                    }
                }
                Some(Outbound::Close(_)) | None => break None,
            },
        }
    };

    // best-effort close frame so well-behaved clients see a clean shutdown
    let _ = socket.send(Message::Close(None)).await;
    if let Some(why) = why {
        let _ = context.events.send(Event::Closed { tag, reason: why }).await;
    }
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
