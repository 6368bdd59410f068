//! # Wire Framing
//!
//! Every value on the wire is a bincode blob behind a 4-byte big-endian
//! length prefix:
//!
//! ```text
//! +------------------+--------------------+
//! | Length (4B BE)   | Payload (bincode)  |
//! +------------------+--------------------+
//! ```
//!
//! A request is a one-byte [`RpcType`] tag followed by one value. A response
//! is always two values: the error string (empty on success) and then the
//! optional response body. Both ends decode in exactly this order.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::MAX_FRAME_SIZE;
use crate::error::{Result, TransportError};
use crate::transport::rpc::{Command, Response, RpcResponse, RpcType, SyncRequest, SyncResponse};

/// Writes one length-prefixed value. Does not flush.
pub async fn write_value<W, T>(w: &mut W, value: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize + ?Sized,
{
    let bytes = bincode::serialize(value)?;
    if bytes.len() > MAX_FRAME_SIZE {
        return Err(TransportError::FrameTooLarge {
            size: bytes.len(),
            max: MAX_FRAME_SIZE,
        });
    }
    w.write_u32(bytes.len() as u32).await?;
    w.write_all(&bytes).await?;
    Ok(())
}

/// Reads one length-prefixed value.
pub async fn read_value<R, T>(r: &mut R) -> Result<T>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let len = r.read_u32().await? as usize;
    if len > MAX_FRAME_SIZE {
        return Err(TransportError::FrameTooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        });
    }
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf).await?;
    Ok(bincode::deserialize(&buf)?)
}

/// Writes a request frame: tag byte, then the encoded arguments.
pub async fn write_request<W, T>(w: &mut W, rpc_type: RpcType, args: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize + ?Sized,
{
    w.write_u8(rpc_type.into()).await?;
    write_value(w, args).await
}

/// Reads the next request frame.
///
/// End-of-stream before the tag byte is a clean hang-up and is reported as
/// [`TransportError::ConnectionClosed`]; anywhere else it is an I/O error.
pub async fn read_command<R>(r: &mut R) -> Result<Command>
where
    R: AsyncRead + Unpin,
{
    let tag = match r.read_u8().await {
        Ok(tag) => tag,
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(TransportError::ConnectionClosed)
        }
        Err(err) => return Err(err.into()),
    };

    match RpcType::try_from(tag)? {
        RpcType::Sync => {
            let req: SyncRequest = read_value(r).await?;
            Ok(Command::Sync(req))
        }
    }
}

/// Writes the error string followed by the response value. Does not flush.
pub async fn write_response<W>(w: &mut W, resp: RpcResponse) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    write_value(w, resp.error.as_deref().unwrap_or("")).await?;
    match resp.response {
        Some(Response::Sync(body)) => write_value(w, &Some(body)).await,
        None => write_value(w, &None::<SyncResponse>).await,
    }
}

/// Reads the error string and the response value, in that order.
pub async fn read_response<R, T>(r: &mut R) -> Result<(String, Option<T>)>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let error: String = read_value(r).await?;
    let body: Option<T> = read_value(r).await?;
    Ok((error, body))
}
