//! TCP transport and wire protocol for remote-hand.
//!
//! This crate handles the single-client TCP listener, message
//! serialisation/deserialisation (via bincode v2), and the length-prefixed
//! framing shared by the agent and its clients.

pub mod client;
pub mod connection;
pub mod error;
pub mod transport;
pub mod wire;

pub use client::AgentClient;
pub use connection::{FrameReader, FrameWriter, PeerConnection};
pub use error::ProtocolError;
pub use transport::TcpTransport;
