//! Client side of the agent protocol.

use std::net::SocketAddr;

use remote_hand_types::{Request, Response};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::debug;

use crate::connection::PeerConnection;
use crate::error::ProtocolError;
use crate::wire::MAX_RESPONSE_SIZE;

/// A controlling client connected to a running agent.
pub struct AgentClient {
    conn: PeerConnection,
}

impl AgentClient {
    /// Connect to an agent.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ProtocolError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let remote = stream.peer_addr()?;
        debug!(remote = %remote, "connected to agent");
        Ok(Self {
            conn: PeerConnection::new(stream, remote, MAX_RESPONSE_SIZE),
        })
    }

    pub fn remote_address(&self) -> SocketAddr {
        self.conn.remote_address()
    }

    /// Send a request and wait for its response.
    pub async fn request(&mut self, req: &Request) -> Result<Response, ProtocolError> {
        self.conn.send(req).await?;
        self.conn.recv().await
    }

    /// Send a request without waiting for a response.
    pub async fn send(&mut self, req: &Request) -> Result<(), ProtocolError> {
        self.conn.send(req).await
    }

    /// Wait for the next response.
    pub async fn recv(&mut self) -> Result<Response, ProtocolError> {
        self.conn.recv().await
    }
}
