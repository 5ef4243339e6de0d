//! Connection transports.
//!
//! Both adapters speak to the engine through the same [`crate::engine::Event`]
//! / [`crate::engine::Outbound`] contract and share its registry and frame
//! buffers; only the byte edges differ — TCP passes raw bytes through,
//! WebSocket feeds decoded text-frame payloads.

pub mod tcp;
pub mod ws;
