//! TCP adapter — raw line-protocol clients.
//!
//! DESIGN
//! ======
//! One task per connection, `select!`ing between socket reads and the
//! engine's outbound commands. Bytes pass through unmodified in both
//! directions; framing happens in the engine's per-connection buffer.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::warn;

use crate::engine::{Event, OUTBOUND_QUEUE_DEPTH, Outbound};
use crate::protocol::{self, reason};

/// Accept loop. Runs for the process lifetime.
pub async fn serve(listener: TcpListener, name: String, events: mpsc::Sender<Event>) {
    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "tcp accept failed");
                continue;
            }
        };
        let tag = protocol::connection_tag(&name, peer);
        tokio::spawn(run_conn(socket, tag, peer, events.clone()));
    }
}

async fn run_conn(mut socket: TcpStream, tag: String, peer: SocketAddr, events: mpsc::Sender<Event>) {
    let (writer, mut outbound) = mpsc::channel::<Outbound>(OUTBOUND_QUEUE_DEPTH);
    let open = Event::Open { tag: tag.clone(), address: peer.ip().to_string(), writer };
    if events.send(open).await.is_err() {
        return; // engine is gone, nothing to register with
    }

    let mut buf = [0u8; 2048];
    let why = loop {
        tokio::select! {
            read = socket.read(&mut buf) => match read {
                Ok(0) => break reason::EOF,
                Ok(n) => {
                    let data = Event::Data { tag: tag.clone(), chunk: buf[..n].to_vec() };
                    if events.send(data).await.is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!(%tag, error = %e, "tcp read failed");
                    break reason::READ_ERROR;
                }
            },
            command = outbound.recv() => match command {
                Some(Outbound::Deliver(payload)) => {
                    if socket.write_all(payload.as_bytes()).await.is_err() {
                        break reason::SEND_ERROR;
                    }
                }
                // Engine-commanded close: the registry already settled this
                // connection (or never held it), so report nothing back.
                Some(Outbound::Close(_)) | None => return,
            },
        }
    };

    let _ = events.send(Event::Closed { tag, reason: why }).await;
}

#[cfg(test)]
#[path = "tcp_test.rs"]
mod tests;
