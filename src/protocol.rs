//! Bus wire protocol — line formats, tags, and close reasons.
//!
//! DESIGN
//! ======
//! Everything crossing the bus is one plain-text line of single-space
//! separated positional fields. Consumers parse these lines positionally,
//! so the layouts here are normative:
//! - outbound: `connect <tag> <address>`, `disconnect <tag> <reason>`,
//!   `message <tag> <payload>`, `reset <name> server restart`
//! - inbound:  `<tag1>,<tag2>,...,<tagN> <payload>` — the first field is a
//!   comma-joined tag list, the remainder (possibly empty) is the payload.
//!
//! Tags double as bus addresses, which is why every token embedded in a
//! line must be free of spaces: one stray space shifts every later field.

use std::net::SocketAddr;

// =============================================================================
// CLOSE REASONS
// =============================================================================

/// Reasons published in `disconnect` lines. Single tokens, never spaced.
pub mod reason {
    /// Peer hung up or finished the stream.
    pub const EOF: &str = "eof";
    /// Reading from the socket failed.
    pub const READ_ERROR: &str = "read_error";
    /// A bus consumer addressed the tag with an empty payload.
    pub const SERVER_CLOSE: &str = "server_close";
    /// Outbound delivery to the connection failed.
    pub const SEND_ERROR: &str = "send_error";
    /// Inbound WebSocket traffic failed to decode.
    pub const PARSE_ERROR: &str = "parse_error";
    /// A second live connection produced the same tag.
    pub const DUPLICATE_TAG: &str = "duplicate_tag";
}

// =============================================================================
// TAGS
// =============================================================================

/// Build the connection tag: `<name>:<ip>-<port>`. Address and port are
/// unique per accepted socket at any instant, which is what makes the tag
/// unique for the connection's lifetime.
#[must_use]
pub fn connection_tag(name: &str, peer: SocketAddr) -> String {
    format!("{}:{}-{}", name, peer.ip(), peer.port())
}

/// Reserved prefix for message lines. The frame buffer stores this once
/// per connection and appends the payload at emit time.
#[must_use]
pub fn message_prefix(tag: &str) -> String {
    format!("message {tag} ")
}

// =============================================================================
// OUTBOUND LINES
// =============================================================================

/// Published once, immediately after the connection is registered.
#[must_use]
pub fn connect_line(tag: &str, address: &str) -> String {
    format!("connect {tag} {address}")
}

/// Published once, as the connection is removed. The reason is sanitized
/// here so a transport-supplied string can never corrupt the line format.
#[must_use]
pub fn disconnect_line(tag: &str, reason: &str) -> String {
    format!("disconnect {tag} {}", sanitize_token(reason))
}

/// Published once at startup, before subscribing: every tag from a prior
/// run of this mux name is now invalid.
#[must_use]
pub fn reset_line(name: &str) -> String {
    format!("reset {name} server restart")
}

/// Collapse a string into a single space-free token. Empty input becomes
/// `"unknown"` so positional consumers always see a field.
#[must_use]
pub fn sanitize_token(raw: &str) -> String {
    if raw.is_empty() {
        return "unknown".to_string();
    }
    raw.chars().map(|c| if c.is_whitespace() { '_' } else { c }).collect()
}

// =============================================================================
// INBOUND FANOUT LINES
// =============================================================================

/// A parsed inbound bus line: recipients plus the payload to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fanout<'a> {
    /// Recipient tags, in line order. Empty tokens from stray commas are
    /// already dropped.
    pub tags: Vec<&'a str>,
    /// Delivered verbatim. Empty payload means "close the recipients".
    pub payload: &'a str,
}

/// Split a bus line into its tag list and payload. Never fails: a line
/// without a space is all tags and an empty payload.
#[must_use]
pub fn parse_fanout(line: &str) -> Fanout<'_> {
    let (tag_field, payload) = match line.split_once(' ') {
        Some((tags, payload)) => (tags, payload),
        None => (line, ""),
    };
    let tags = tag_field.split(',').filter(|tag| !tag.is_empty()).collect();
    Fanout { tags, payload }
}

#[cfg(test)]
#[path = "protocol_test.rs"]
mod tests;
