//! tagmux — tag-addressed protocol multiplexer.
//!
//! Terminates raw TCP line-protocol and WebSocket clients, frames their
//! traffic into newline-delimited messages, and bridges every connection
//! to a Redis list-backed message bus under a unique per-connection tag.
//! Bus consumers address replies (or closes) back to one or more tags.

mod bus;
mod config;
mod engine;
mod framing;
mod protocol;
mod registry;
mod transport;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use bus::{Bus, RedisBus};
use config::MuxConfig;
use engine::{Engine, Event};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = MuxConfig::from_env();

    let bus: Arc<dyn Bus> = Arc::new(
        RedisBus::connect(&config.redis_url)
            .await
            .expect("redis connect failed"),
    );

    // Tell bus consumers every tag from a previous run is now invalid,
    // then start popping our inbound queue.
    bus.publish(&config.out_queue, protocol::reset_line(&config.name))
        .await
        .expect("reset publish failed");
    let mut lines = bus
        .subscribe(&config.in_queue())
        .await
        .expect("bus subscribe failed");

    let (events, event_queue) = mpsc::channel::<Event>(engine::EVENT_QUEUE_DEPTH);

    // Forward popped lines into the engine's serialized event stream.
    let bus_events = events.clone();
    tokio::spawn(async move {
        while let Some(line) = lines.recv().await {
            if bus_events.send(Event::Bus { line }).await.is_err() {
                return;
            }
        }
        tracing::error!("bus subscription ended");
    });

    let tcp_listener = TcpListener::bind(format!("0.0.0.0:{}", config.tcp_port))
        .await
        .expect("tcp bind failed");
    tokio::spawn(transport::tcp::serve(tcp_listener, config.name.clone(), events.clone()));

    let ws_listener = TcpListener::bind(format!("0.0.0.0:{}", config.ws_port))
        .await
        .expect("websocket bind failed");
    let router = transport::ws::app(transport::ws::WsContext {
        name: config.name.clone(),
        events,
    });
    tokio::spawn(async move {
        axum::serve(ws_listener, router.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .expect("websocket server failed");
    });

    tracing::info!(
        name = %config.name,
        tcp_port = config.tcp_port,
        ws_port = config.ws_port,
        "tagmux listening"
    );

    let engine = Engine::new(bus, config.out_queue.clone(), event_queue);
    if let Err(e) = engine.run().await {
        tracing::error!(error = %e, "bus publish failed, shutting down");
        std::process::exit(1);
    }
}
