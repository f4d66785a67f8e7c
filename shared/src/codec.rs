//! Length-prefixed bincode framing for TCP streams.
//!
//! Each frame is a big-endian `u32` byte count followed by that many bytes of
//! bincode. Frames above [`MAX_FRAME_LEN`] are refused in both directions.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const MAX_FRAME_LEN: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("frame of {len} bytes exceeds the {MAX_FRAME_LEN} byte limit")]
    TooLarge { len: usize },
}

pub fn encode_frame<T: Serialize>(packet: &T) -> Result<Vec<u8>, FrameError> {
    let body = bincode::serialize(packet)?;
    if body.len() > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge { len: body.len() });
    }
    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Reads one frame. Returns `Ok(None)` when the peer closed the stream cleanly
/// between frames.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>, FrameError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if len > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge { len });
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(bincode::deserialize(&body)?))
}

pub async fn write_frame<W, T>(writer: &mut W, packet: &T) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame = encode_frame(packet)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}
