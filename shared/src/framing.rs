//! Reading and writing protocol frames over async byte streams.

use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::protocol::{parse_len_of_len, parse_payload_len, DecodeError, LENOFLEN};
use crate::Message;

#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    #[error("connection closed")]
    ConnectionClosed,
    #[error("malformed frame: {0}")]
    Malformed(#[from] DecodeError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl FramingError {
    /// Whether the stream is unusable afterwards. A malformed frame only costs
    /// the bytes it occupied.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, FramingError::Malformed(_))
    }
}

async fn fill<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> Result<(), FramingError> {
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(FramingError::ConnectionClosed),
        Err(e) => Err(FramingError::Io(e)),
    }
}

/// Skips the body of a frame that will not be decoded.
async fn discard<R: AsyncRead + Unpin>(reader: &mut R, len: usize) -> Result<(), FramingError> {
    let mut body = (&mut *reader).take(len as u64);
    let skipped = tokio::io::copy(&mut body, &mut tokio::io::sink()).await?;
    if skipped < len as u64 {
        return Err(FramingError::ConnectionClosed);
    }
    Ok(())
}

/// Reads one frame and returns its raw payload. An oversized frame is
/// consumed whole and reported as malformed.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, FramingError> {
    let mut len_of_len = [0u8; LENOFLEN];
    fill(reader, &mut len_of_len).await?;
    let width = parse_len_of_len(&len_of_len)?;

    let mut len_digits = vec![0u8; width];
    fill(reader, &mut len_digits).await?;
    let payload_len = match parse_payload_len(&len_digits) {
        Err(DecodeError::PayloadTooLarge(len)) => {
            discard(reader, len).await?;
            return Err(DecodeError::PayloadTooLarge(len).into());
        }
        other => other?,
    };

    let mut payload = vec![0u8; payload_len];
    fill(reader, &mut payload).await?;
    Ok(payload)
}

pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Message, FramingError> {
    let payload = read_frame(reader).await?;
    let text = std::str::from_utf8(&payload).map_err(|_| DecodeError::InvalidUtf8)?;
    Ok(Message::decode_payload(text)?)
}

pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    frame: &[u8],
) -> Result<(), FramingError> {
    writer.write_all(frame).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message: &Message,
) -> Result<(), FramingError> {
    write_frame(writer, &message.to_frame()).await
}
