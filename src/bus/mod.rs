//! Message bus — the blocking-list queue store seam.
//!
//! DESIGN
//! ======
//! The engine sees two primitives: ordered fire-and-forget `publish` onto
//! a named list, and a FIFO `subscribe` stream popped from a named list
//! by a dedicated task, delivered one line at a time. Delivery and
//! durability guarantees live on the other side of this seam; the engine
//! assumes a publish either lands or the process goes down.

mod memory;
mod redis;

pub use memory::MemoryBus;
pub use redis::RedisBus;

use async_trait::async_trait;
use tokio::sync::mpsc;

use ::redis::RedisError;

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("redis error: {0}")]
    Redis(#[from] RedisError),
    #[error("publish failed: {0}")]
    Publish(String),
}

#[async_trait]
pub trait Bus: Send + Sync {
    /// Append `line` to the named list. Call order is delivery order.
    ///
    /// # Errors
    ///
    /// Fails only when the bus itself is down; callers treat that as
    /// fatal.
    async fn publish(&self, queue: &str, line: String) -> Result<(), BusError>;

    /// Start popping the named list in FIFO order. Lines arrive on the
    /// returned channel one at a time; the popping task never runs two
    /// handlers concurrently because there is exactly one stream.
    ///
    /// # Errors
    ///
    /// Fails when the subscription connection cannot be established.
    async fn subscribe(&self, queue: &str) -> Result<mpsc::Receiver<String>, BusError>;
}
