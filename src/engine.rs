//! Mux engine — the single task that owns all connection state.
//!
//! DESIGN
//! ======
//! Transports and the bus subscription never touch the registry directly:
//! they send [`Event`]s into one mpsc channel and the engine processes
//! them strictly in order. Every registry and frame-buffer mutation is
//! therefore single-writer without a lock. Outbound traffic flows the
//! other way through each connection's bounded [`Outbound`] channel,
//! drained by the socket task that owns the transport.
//!
//! LIFECYCLE
//! =========
//! 1. `Open` → registry insert → publish `connect <tag> <address>`
//! 2. `Data` → frame buffer → publish `message <tag> <payload>` per frame
//! 3. `Bus` → fanout: deliver the payload to each addressed tag, or close
//!    it when the payload is empty
//! 4. `Closed` / dispatcher close → registry remove → publish
//!    `disconnect <tag> <reason>`, exactly once per connection
//!
//! A close can race itself — the dispatcher closes a tag while its socket
//! task concurrently hits EOF. Whichever report arrives second finds the
//! tag already removed and publishes nothing.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::bus::{Bus, BusError};
use crate::protocol::{self, reason};
use crate::registry::{Client, Registry};

/// Depth of the engine's event channel.
pub const EVENT_QUEUE_DEPTH: usize = 1024;

/// Depth of each connection's outbound command channel.
pub const OUTBOUND_QUEUE_DEPTH: usize = 64;

// =============================================================================
// EVENTS
// =============================================================================

/// Everything the engine reacts to. Transport tasks and the bus
/// subscription are the only producers.
#[derive(Debug)]
pub enum Event {
    /// A transport accepted a connection and will drain `writer`.
    Open {
        tag: String,
        address: String,
        writer: mpsc::Sender<Outbound>,
    },
    /// Bytes read from a connection — raw for TCP, the decoded text-frame
    /// payload for WebSocket.
    Data { tag: String, chunk: Vec<u8> },
    /// The transport lost the connection on its own. Never sent for an
    /// engine-commanded close — the registry is settled before the close
    /// command goes out, and a tag may already belong to a successor.
    Closed { tag: String, reason: &'static str },
    /// One line popped from the inbound bus queue.
    Bus { line: String },
}

/// Commands the engine queues for a connection's socket task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Write the payload verbatim — no re-framing, no delimiter added.
    Deliver(String),
    /// Tear the connection down.
    Close(&'static str),
}

// =============================================================================
// ENGINE
// =============================================================================

pub struct Engine {
    registry: Registry,
    bus: Arc<dyn Bus>,
    out_queue: String,
    events: mpsc::Receiver<Event>,
}

impl Engine {
    #[must_use]
    pub fn new(bus: Arc<dyn Bus>, out_queue: String, events: mpsc::Receiver<Event>) -> Self {
        Self { registry: Registry::new(), bus, out_queue, events }
    }

    /// Process events until every sender is dropped.
    ///
    /// # Errors
    ///
    /// Returns the first failed bus publish. The bus either works or the
    /// process goes down with it — there is no partial-bus recovery here.
    pub async fn run(mut self) -> Result<(), BusError> {
        while let Some(event) = self.events.recv().await {
            match event {
                Event::Open { tag, address, writer } => self.handle_open(tag, &address, writer).await?,
                Event::Data { tag, chunk } => self.handle_data(&tag, &chunk).await?,
                Event::Closed { tag, reason } => self.handle_closed(&tag, reason).await?,
                Event::Bus { line } => self.handle_bus_line(&line).await?,
            }
        }
        Ok(())
    }

    async fn handle_open(
        &mut self,
        tag: String,
        address: &str,
        writer: mpsc::Sender<Outbound>,
    ) -> Result<(), BusError> {
        let client = Client::new(tag.clone(), writer);
        match self.registry.insert(client) {
            Ok(()) => {
                info!(%tag, %address, clients = self.registry.len(), "client connected");
                self.publish(protocol::connect_line(&tag, address)).await
            }
            Err(collision) => {
                // Address/port make tags unique per instant, so a collision
                // means the old connection's close has not landed yet. The
                // newcomer loses; the registered client is untouched.
                warn!(%tag, "duplicate tag, rejecting new connection");
                collision.rejected.close(reason::DUPLICATE_TAG);
                Ok(())
            }
        }
    }

    async fn handle_data(&mut self, tag: &str, chunk: &[u8]) -> Result<(), BusError> {
        // Data can race a dispatcher-issued close; late chunks are dropped.
        let Some(client) = self.registry.get_mut(tag) else {
            return Ok(());
        };
        let lines = client.buffer_mut().push(chunk);
        for line in lines {
            self.publish(line).await?;
        }
        Ok(())
    }

    async fn handle_closed(&mut self, tag: &str, why: &'static str) -> Result<(), BusError> {
        if self.registry.remove(tag).is_none() {
            return Ok(());
        }
        info!(%tag, reason = why, clients = self.registry.len(), "client disconnected");
        self.publish(protocol::disconnect_line(tag, why)).await
    }

    /// Fanout dispatch: one popped bus line, possibly many recipients.
    /// A failure on one recipient never aborts delivery to the rest.
    async fn handle_bus_line(&mut self, line: &str) -> Result<(), BusError> {
        let fanout = protocol::parse_fanout(line);
        for tag in fanout.tags {
            let Some(client) = self.registry.get(tag) else {
                // already disconnected — an expected race, not an error
                continue;
            };
            if fanout.payload.is_empty() {
                self.close_client(tag, reason::SERVER_CLOSE).await?;
            } else if client.deliver(fanout.payload.to_string()).is_err() {
                warn!(%tag, "outbound delivery failed");
                self.close_client(tag, reason::SEND_ERROR).await?;
            }
        }
        Ok(())
    }

    /// Dispatcher-issued close: remove, notify the socket task, publish.
    async fn close_client(&mut self, tag: &str, why: &'static str) -> Result<(), BusError> {
        let Some(client) = self.registry.remove(tag) else {
            return Ok(());
        };
        info!(%tag, reason = why, clients = self.registry.len(), "closing client");
        client.close(why);
        self.publish(protocol::disconnect_line(tag, why)).await
    }

    async fn publish(&self, line: String) -> Result<(), BusError> {
        self.bus.publish(&self.out_queue, line).await
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
