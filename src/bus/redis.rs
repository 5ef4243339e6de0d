//! Redis list bus — RPUSH to publish, BLPOP to subscribe.

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tokio::sync::mpsc;
use tracing::{error, info};

use super::{Bus, BusError};

/// Depth of a subscription's line channel.
const SUBSCRIPTION_DEPTH: usize = 64;

pub struct RedisBus {
    client: Client,
    conn: ConnectionManager,
}

impl RedisBus {
    /// Connect to Redis. The URL may carry a database index, e.g.
    /// `redis://127.0.0.1:6379/7`.
    ///
    /// # Errors
    ///
    /// Returns the underlying connection error.
    pub async fn connect(url: &str) -> Result<Self, BusError> {
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client.clone()).await?;
        info!(%url, "connected to redis");
        Ok(Self { client, conn })
    }
}

#[async_trait::async_trait]
impl Bus for RedisBus {
    async fn publish(&self, queue: &str, line: String) -> Result<(), BusError> {
        let mut conn = self.conn.clone();
        let _len: i64 = conn.rpush(queue, line).await?;
        Ok(())
    }

    async fn subscribe(&self, queue: &str) -> Result<mpsc::Receiver<String>, BusError> {
        // BLPOP parks its connection, so the subscription gets a dedicated
        // one instead of sharing the managed publish connection.
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let queue = queue.to_string();
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_DEPTH);
        tokio::spawn(async move {
            loop {
                let popped: Result<Option<(String, String)>, _> = conn.blpop(&queue, 0.0).await;
                match popped {
                    Ok(Some((_, line))) => {
                        if tx.send(line).await.is_err() {
                            break; // subscriber gone
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        error!(%queue, error = %e, "bus subscription failed");
                        break;
                    }
                }
            }
        });
        Ok(rx)
    }
}
