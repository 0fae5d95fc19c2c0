//! TCP transport: bind and accept a single client.

use std::net::SocketAddr;

use tokio::net::{lookup_host, TcpListener};
use tracing::{debug, info, warn};

use crate::connection::PeerConnection;
use crate::error::ProtocolError;

/// Listening socket for the agent.
///
/// The agent serves exactly one client for its whole run, so
/// [`accept`](Self::accept) consumes the transport and the listening socket
/// is closed as soon as the client is connected.
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    /// Resolve `address` and listen on `port`.
    ///
    /// Host names are resolved through the system resolver. IPv4 results are
    /// preferred so that `localhost` binds `127.0.0.1`.
    pub async fn bind(address: &str, port: u16) -> Result<Self, ProtocolError> {
        let listen_err = |reason: String| ProtocolError::Listen {
            address: format!("{address}:{port}"),
            reason,
        };

        let candidates: Vec<SocketAddr> = lookup_host((address, port))
            .await
            .map_err(|e| listen_err(e.to_string()))?
            .collect();
        let addr = candidates
            .iter()
            .find(|a| a.is_ipv4())
            .or_else(|| candidates.first())
            .copied()
            .ok_or_else(|| listen_err("address did not resolve".to_string()))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| listen_err(e.to_string()))?;
        info!(addr = %addr, "TCP transport bound");
        Ok(Self { listener })
    }

    /// Get the local address this transport is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ProtocolError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept the one client connection.
    pub async fn accept(
        self,
        nodelay: bool,
        max_frame: u32,
    ) -> Result<PeerConnection, ProtocolError> {
        let (stream, remote) = self.listener.accept().await?;
        if nodelay {
            if let Err(e) = stream.set_nodelay(true) {
                warn!(error = %e, "failed to set TCP_NODELAY");
            }
        }
        debug!(remote = %remote, "accepted connection");
        Ok(PeerConnection::new(stream, remote, max_frame))
    }
}
