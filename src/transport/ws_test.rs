use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WireMessage;

use super::*;
use crate::bus::MemoryBus;
use crate::engine::Engine;

struct Mux {
    bus: Arc<MemoryBus>,
    events: mpsc::Sender<Event>,
    addr: SocketAddr,
}

async fn start_mux() -> Mux {
    let bus = Arc::new(MemoryBus::new());
    let (events, event_queue) = mpsc::channel(64);
    let engine = Engine::new(bus.clone(), "mq:kernel".to_string(), event_queue);
    tokio::spawn(engine.run());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app(WsContext { name: "wsmux".to_string(), events: events.clone() });
    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .unwrap();
    });
    Mux { bus, events, addr }
}

async fn wait_for_line(bus: &MemoryBus, predicate: impl Fn(&str) -> bool) -> String {
    timeout(Duration::from_secs(1), async {
        loop {
            let hit = bus
                .published()
                .await
                .into_iter()
                .map(|(_, line)| line)
                .find(|line| predicate(line));
            if let Some(line) = hit {
                return line;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timed out waiting for bus line")
}

#[tokio::test]
async fn websocket_round_trip_through_bus() {
    let mux = start_mux().await;
    let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{}/", mux.addr))
        .await
        .expect("websocket connect failed");

    let connect = wait_for_line(&mux.bus, |line| line.starts_with("connect ")).await;
    let tag = connect.split(' ').nth(1).unwrap().to_string();
    assert!(tag.starts_with("wsmux:127.0.0.1-"));

    // newline framing applies inside the decoded payload stream: a frame
    // may span websocket messages, and one message may carry two frames
    socket.send(WireMessage::Text("hel".into())).await.unwrap();
    socket.send(WireMessage::Text("lo\nworld\n".into())).await.unwrap();
    wait_for_line(&mux.bus, |line| line == format!("message {tag} world")).await;
    let lines: Vec<String> = mux.bus.published().await.into_iter().map(|(_, line)| line).collect();
    assert_eq!(lines[1], format!("message {tag} hello"));

    // fanout back to the same tag arrives as one text frame
    mux.events
        .send(Event::Bus { line: format!("{tag} pong") })
        .await
        .unwrap();
    let reply = timeout(Duration::from_secs(1), socket.next())
        .await
        .expect("timed out waiting for reply")
        .expect("stream ended")
        .expect("websocket error");
    assert_eq!(reply, WireMessage::Text("pong".into()));
}

#[tokio::test]
async fn empty_fanout_payload_closes_the_websocket() {
    let mux = start_mux().await;
    let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{}/", mux.addr))
        .await
        .expect("websocket connect failed");

    let connect = wait_for_line(&mux.bus, |line| line.starts_with("connect ")).await;
    let tag = connect.split(' ').nth(1).unwrap().to_string();

    mux.events.send(Event::Bus { line: tag.clone() }).await.unwrap();

    let next = timeout(Duration::from_secs(1), socket.next())
        .await
        .expect("timed out waiting for close");
    assert!(
        matches!(next, None | Some(Ok(WireMessage::Close(_))) | Some(Err(_))),
        "expected the connection to end, got {next:?}"
    );

    let disconnect = wait_for_line(&mux.bus, |line| line.starts_with("disconnect ")).await;
    assert_eq!(disconnect, format!("disconnect {tag} server_close"));
}

#[tokio::test]
async fn client_close_publishes_disconnect() {
    let mux = start_mux().await;
    let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{}/", mux.addr))
        .await
        .expect("websocket connect failed");

    let connect = wait_for_line(&mux.bus, |line| line.starts_with("connect ")).await;
    let tag = connect.split(' ').nth(1).unwrap().to_string();

    socket.close(None).await.unwrap();

    let disconnect = wait_for_line(&mux.bus, |line| line.starts_with("disconnect ")).await;
    assert_eq!(disconnect, format!("disconnect {tag} eof"));
}
