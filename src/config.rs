//! Runtime configuration parsed from environment variables.

use crate::protocol;

pub const DEFAULT_NAME: &str = "mux";
pub const DEFAULT_TCP_PORT: u16 = 5555;
pub const DEFAULT_WS_PORT: u16 = 8888;
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/7";
pub const DEFAULT_OUT_QUEUE: &str = "mq:kernel";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxConfig {
    /// Tag namespace prefix and inbound bus channel name.
    pub name: String,
    pub tcp_port: u16,
    pub ws_port: u16,
    pub redis_url: String,
    /// Outbound list every connect/message/disconnect line lands on.
    pub out_queue: String,
}

impl MuxConfig {
    /// Build config from environment variables, all optional:
    ///
    /// - `MUX_NAME`: default `"mux"`. The name is embedded in
    ///   space-separated bus lines, so whitespace is sanitized away.
    /// - `MUX_TCP_PORT`: default 5555
    /// - `MUX_WS_PORT`: default 8888
    /// - `REDIS_URL`: default `redis://127.0.0.1:6379/7`
    /// - `MUX_OUT_QUEUE`: default `mq:kernel`
    #[must_use]
    pub fn from_env() -> Self {
        let name = std::env::var("MUX_NAME").unwrap_or_else(|_| DEFAULT_NAME.to_string());
        Self {
            name: protocol::sanitize_token(&name),
            tcp_port: env_parse_u16("MUX_TCP_PORT", DEFAULT_TCP_PORT),
            ws_port: env_parse_u16("MUX_WS_PORT", DEFAULT_WS_PORT),
            redis_url: std::env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string()),
            out_queue: std::env::var("MUX_OUT_QUEUE").unwrap_or_else(|_| DEFAULT_OUT_QUEUE.to_string()),
        }
    }

    /// Inbound list the bus consumers address this mux on.
    #[must_use]
    pub fn in_queue(&self) -> String {
        format!("mq:{}", self.name)
    }
}

fn env_parse_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
