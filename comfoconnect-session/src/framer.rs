//! Length-prefixed framer
//!
//! Reader and writer halves are independent so a session can run a read loop
//! concurrently with writers. Writers on the same transport must serialize
//! through a single `FrameWriter`; one `write_frame` call emits the length
//! and the body as one atomic unit with respect to other callers.

use std::io::ErrorKind;

use comfoconnect_core::{ComfoError, ComfoResult};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single frame; anything larger is a protocol violation.
pub const MAX_FRAME_LENGTH: usize = 1024 * 1024;

/// Smallest valid envelope: source uuid, destination uuid and the operation
/// length word.
pub const MIN_FRAME_LENGTH: usize = 16 + 16 + 2;

/// Reading half of a framed transport
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Create a new frame reader over a byte stream
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read the next complete envelope.
    ///
    /// Returns `PeerClosed` on a clean end of stream between frames and
    /// `ProtocolViolation` when the stream ends inside a frame or the length
    /// prefix is out of bounds.
    pub async fn read_frame(&mut self) -> ComfoResult<Vec<u8>> {
        let mut length_buf = [0u8; 4];
        match self.inner.read_exact(&mut length_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Err(ComfoError::PeerClosed),
            Err(e) => return Err(ComfoError::Connection(e)),
        }

        let length = u32::from_be_bytes(length_buf) as usize;
        if length > MAX_FRAME_LENGTH {
            return Err(ComfoError::ProtocolViolation(format!(
                "frame of {length} bytes exceeds the {MAX_FRAME_LENGTH} byte ceiling"
            )));
        }
        if length < MIN_FRAME_LENGTH {
            return Err(ComfoError::ProtocolViolation(format!(
                "frame of {length} bytes is below the {MIN_FRAME_LENGTH} byte envelope minimum"
            )));
        }

        let mut frame = vec![0u8; length];
        match self.inner.read_exact(&mut frame).await {
            Ok(_) => Ok(frame),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(ComfoError::ProtocolViolation(
                format!("stream ended inside a frame of {length} bytes"),
            )),
            Err(e) => Err(ComfoError::Connection(e)),
        }
    }
}

/// Writing half of a framed transport
#[derive(Debug)]
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Create a new frame writer over a byte stream
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write one envelope as a length-prefixed frame and flush it.
    pub async fn write_frame(&mut self, envelope: &[u8]) -> ComfoResult<()> {
        if envelope.len() > MAX_FRAME_LENGTH {
            return Err(ComfoError::ProtocolViolation(format!(
                "refusing to send a frame of {} bytes",
                envelope.len()
            )));
        }
        self.inner
            .write_all(&(envelope.len() as u32).to_be_bytes())
            .await?;
        self.inner.write_all(envelope).await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Shut down the underlying stream.
    pub async fn shutdown(&mut self) {
        let _ = self.inner.shutdown().await;
    }
}
