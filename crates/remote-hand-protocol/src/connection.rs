//! TCP connection and stream framing.

use std::net::SocketAddr;

use bincode::{Decode, Encode};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::trace;

use crate::error::ProtocolError;
use crate::wire::{self, LENGTH_PREFIX};

/// The single client connection served by the agent.
pub struct PeerConnection {
    reader: FrameReader<OwnedReadHalf>,
    writer: FrameWriter<OwnedWriteHalf>,
    remote: SocketAddr,
}

impl PeerConnection {
    /// Wrap a connected stream, rejecting incoming frames above `max_frame`.
    pub fn new(stream: TcpStream, remote: SocketAddr, max_frame: u32) -> Self {
        let (read, write) = stream.into_split();
        Self {
            reader: FrameReader::new(read, max_frame),
            writer: FrameWriter::new(write),
            remote,
        }
    }

    /// Get the remote address of this connection.
    pub fn remote_address(&self) -> SocketAddr {
        self.remote
    }

    /// Receive and decode one message.
    pub async fn recv<T: Decode<()>>(&mut self) -> Result<T, ProtocolError> {
        self.reader.recv().await
    }

    /// Encode and send one message.
    pub async fn send<T: Encode>(&mut self, msg: &T) -> Result<(), ProtocolError> {
        self.writer.send(msg).await
    }

    /// Split into independent read and write halves.
    pub fn into_split(self) -> (FrameReader<OwnedReadHalf>, FrameWriter<OwnedWriteHalf>) {
        (self.reader, self.writer)
    }
}

/// Reads length-prefixed frames from a byte stream.
pub struct FrameReader<R> {
    stream: R,
    max_frame: u32,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(stream: R, max_frame: u32) -> Self {
        Self { stream, max_frame }
    }

    /// Read one complete frame payload.
    ///
    /// End of stream, whether between or inside frames, is
    /// [`ProtocolError::Closed`]. A frame above the size cap is read and
    /// thrown away before [`ProtocolError::FrameTooLarge`] is returned, so the
    /// next call starts on a frame boundary.
    pub async fn read_frame(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let mut len_buf = [0u8; LENGTH_PREFIX];
        read_exact(&mut self.stream, &mut len_buf).await?;
        let len = u32::from_be_bytes(len_buf);

        if len > self.max_frame {
            let drained = tokio::io::copy(
                &mut (&mut self.stream).take(u64::from(len)),
                &mut tokio::io::sink(),
            )
            .await?;
            if drained < u64::from(len) {
                return Err(ProtocolError::Closed);
            }
            return Err(ProtocolError::FrameTooLarge {
                len,
                max: self.max_frame,
            });
        }

        let mut payload = vec![0u8; len as usize];
        read_exact(&mut self.stream, &mut payload).await?;
        trace!(len, "received frame");
        Ok(payload)
    }

    /// Read one frame and decode it.
    pub async fn recv<T: Decode<()>>(&mut self) -> Result<T, ProtocolError> {
        let payload = self.read_frame().await?;
        wire::decode_message(&payload)
    }
}

/// Writes length-prefixed frames to a byte stream.
pub struct FrameWriter<W> {
    stream: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(stream: W) -> Self {
        Self { stream }
    }

    /// Send a message, encoding it as length-prefixed bincode.
    pub async fn send<T: Encode>(&mut self, msg: &T) -> Result<(), ProtocolError> {
        let frame = wire::encode_message(msg)?;
        self.write_frame(&frame).await
    }

    /// Write an already framed buffer.
    pub async fn write_frame(&mut self, frame: &[u8]) -> Result<(), ProtocolError> {
        self.stream.write_all(frame).await?;
        self.stream.flush().await?;
        trace!(len = frame.len(), "sent frame");
        Ok(())
    }
}

async fn read_exact<R: AsyncRead + Unpin>(
    stream: &mut R,
    buf: &mut [u8],
) -> Result<(), ProtocolError> {
    match stream.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(ProtocolError::Closed),
        Err(e) => Err(ProtocolError::Io(e)),
    }
}
