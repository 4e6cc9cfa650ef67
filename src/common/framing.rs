//! # Length-Prefixed Frame Transport
//!
//! Every channel in the cluster (frontend, backend, control, data-store,
//! heartbeat, notify) rides on the same wire primitive: a 4-byte big-endian
//! length prefix followed by that many bytes of payload.
//!
//! ```text
//! [4 bytes: frame length] [N bytes: frame payload]
//! ```
//!
//! JSON request/reply channels layer a `Message` type over this; the
//! heartbeat and notify channels send raw UTF-8 strings directly as frames.

use anyhow::{bail, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Reject frames larger than this; guards against a corrupt length prefix
/// turning into a multi-gigabyte allocation.
const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Read one length-prefixed frame from `stream`.
///
/// Returns `Ok(None)` on a clean EOF (peer closed before sending a frame).
pub async fn read_frame(stream: &mut TcpStream) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match stream.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_SIZE {
        bail!("frame of {len} bytes exceeds {MAX_FRAME_SIZE} byte limit");
    }

    let mut data = vec![0u8; len];
    stream.read_exact(&mut data).await?;
    Ok(Some(data))
}

/// Write one length-prefixed frame to `stream` and flush.
pub async fn write_frame(stream: &mut TcpStream, payload: &[u8]) -> Result<()> {
    let len = payload.len() as u32;
    stream.write_all(&len.to_be_bytes()).await?;
    stream.write_all(payload).await?;
    stream.flush().await?;
    Ok(())
}

/// Read a frame and interpret it as a JSON value of type `T`.
pub async fn read_json<T>(stream: &mut TcpStream) -> Result<Option<T>>
where
    T: for<'de> serde::Deserialize<'de>,
{
    match read_frame(stream).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Serialize `value` to JSON and write it as one frame.
pub async fn write_json<T: serde::Serialize>(stream: &mut TcpStream, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)?;
    write_frame(stream, &bytes).await
}

/// Read a frame and interpret it as a raw UTF-8 string (used by the
/// heartbeat and notify channels, which are not JSON).
pub async fn read_string(stream: &mut TcpStream) -> Result<Option<String>> {
    match read_frame(stream).await? {
        Some(bytes) => Ok(Some(String::from_utf8(bytes)?)),
        None => Ok(None),
    }
}

/// Write a raw UTF-8 string as one frame.
pub async fn write_string(stream: &mut TcpStream, s: &str) -> Result<()> {
    write_frame(stream, s.as_bytes()).await
}
