//! Client registry — tag → live connection.
//!
//! DESIGN
//! ======
//! One ordered map, owned by the engine task, shared by both transports.
//! A tag resolves to at most one live connection: `insert` rejects
//! collisions without touching the registered entry, and `remove` is
//! idempotent so the dispatcher and the transport can both report the
//! same close. Lookups are exact-match only.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::engine::Outbound;
use crate::framing::FrameBuffer;

// =============================================================================
// CLIENT
// =============================================================================

/// One live connection as the engine sees it: its tag, its inbound frame
/// buffer, and the channel to the socket task that owns the transport.
#[derive(Debug)]
pub struct Client {
    tag: String,
    writer: mpsc::Sender<Outbound>,
    buffer: FrameBuffer,
}

impl Client {
    #[must_use]
    pub fn new(tag: String, writer: mpsc::Sender<Outbound>) -> Self {
        let buffer = FrameBuffer::new(&tag);
        Self { tag, writer, buffer }
    }

    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn buffer_mut(&mut self) -> &mut FrameBuffer {
        &mut self.buffer
    }

    /// Queue a payload for the socket task. A full or closed channel is a
    /// send failure the caller must treat as fatal to this connection.
    ///
    /// # Errors
    ///
    /// Returns the undelivered command when the socket task is gone or
    /// its queue is full.
    pub fn deliver(&self, payload: String) -> Result<(), TrySendError<Outbound>> {
        self.writer.try_send(Outbound::Deliver(payload))
    }

    /// Best-effort teardown notification to the socket task. Dropping the
    /// client afterwards closes the channel, which ends the task even if
    /// this command never fit in the queue.
    pub fn close(&self, reason: &'static str) {
        let _ = self.writer.try_send(Outbound::Close(reason));
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Tag collision on insert. Carries the rejected client back so the
/// caller can close it without disturbing the registered one.
#[derive(Debug, thiserror::Error)]
#[error("duplicate tag: {}", .rejected.tag())]
pub struct DuplicateTag {
    pub rejected: Client,
}

#[derive(Debug, Default)]
pub struct Registry {
    clients: BTreeMap<String, Client>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client under its tag.
    ///
    /// # Errors
    ///
    /// Returns [`DuplicateTag`] when the tag is already live; the
    /// registered client is untouched.
    pub fn insert(&mut self, client: Client) -> Result<(), DuplicateTag> {
        match self.clients.entry(client.tag().to_string()) {
            Entry::Occupied(_) => Err(DuplicateTag { rejected: client }),
            Entry::Vacant(slot) => {
                slot.insert(client);
                Ok(())
            }
        }
    }

    /// Remove and return the client for `tag`. Idempotent: a second call
    /// for the same close is `None`, not an error.
    pub fn remove(&mut self, tag: &str) -> Option<Client> {
        self.clients.remove(tag)
    }

    #[must_use]
    pub fn get(&self, tag: &str) -> Option<&Client> {
        self.clients.get(tag)
    }

    pub fn get_mut(&mut self, tag: &str) -> Option<&mut Client> {
        self.clients.get_mut(tag)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
