//! In-memory bus — the test double for the Redis list store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, mpsc};

use super::{Bus, BusError};

/// Captures publishes for assertions and lets tests feed subscriptions by
/// hand, as if lines were popped from the list.
#[derive(Default)]
pub struct MemoryBus {
    published: Mutex<Vec<(String, String)>>,
    subscriptions: Mutex<HashMap<String, mpsc::Sender<String>>>,
    fail_publish: AtomicBool,
}

impl MemoryBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent publish fail.
    pub fn set_fail_on_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of `(queue, line)` pairs, in publish order.
    pub async fn published(&self) -> Vec<(String, String)> {
        self.published.lock().await.clone()
    }

    /// Drain the captured publishes.
    pub async fn take_published(&self) -> Vec<(String, String)> {
        std::mem::take(&mut *self.published.lock().await)
    }

    /// Push a line into an active subscription.
    ///
    /// # Panics
    ///
    /// Panics when nothing subscribed to `queue` or the subscriber is
    /// gone — in a test either one is a bug worth failing loudly on.
    pub async fn inject(&self, queue: &str, line: &str) {
        let subscriptions = self.subscriptions.lock().await;
        let tx = subscriptions.get(queue).expect("no subscription for queue");
        tx.send(line.to_string()).await.expect("subscription receiver dropped");
    }
}

#[async_trait::async_trait]
impl Bus for MemoryBus {
    async fn publish(&self, queue: &str, line: String) -> Result<(), BusError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(BusError::Publish("memory bus set to fail".to_string()));
        }
        self.published.lock().await.push((queue.to_string(), line));
        Ok(())
    }

    async fn subscribe(&self, queue: &str) -> Result<mpsc::Receiver<String>, BusError> {
        let (tx, rx) = mpsc::channel(64);
        self.subscriptions.lock().await.insert(queue.to_string(), tx);
        Ok(rx)
    }
}
