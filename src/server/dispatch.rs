use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{Error, Result};
use crate::request::{Command, Request};
use crate::socks::*;

use super::dialer::{Dialer, Outbound};

use std::io;


/// Reads one request frame from the client and decodes it.
///
/// A single read may return the whole frame; only the fixed header is
/// waited for before handing the bytes to the codec.
pub async fn read_request<S>(stream: &mut S) -> Result<Request>
where
    S: AsyncRead + Unpin,
{
    let mut buffer = [0u8; SOCKS_MAX_REQUEST_LEN];
    let amt = read_at_least(stream, &mut buffer, SOCKS_HEADER_LEN).await?;

    let request = Request::decode(&buffer[..amt])?;
    debug!("socks5 request {}", request);

    Ok(request)
}

/// Routes a validated request by its command.
pub async fn dispatch<D>(request: &Request, dialer: &D) -> Result<Outbound<D::Stream>>
where
    D: Dialer,
{
    match request.cmd() {
        Some(Command::Connect) => {
            let outbound = dialer.dial(&request.address, request.port).await?;
            Ok(outbound)
        },
        // BIND and UDP ASSOCIATE would be routed here.
        _ => Err(Error::UnsupportedCommand(request.command)),
    }
}

async fn read_at_least<R>(reader: &mut R, buf: &mut [u8], min: usize) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut amt = 0;
    while amt < min {
        let n = reader.read(&mut buf[amt..]).await?;
        if n == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed before request header"));
        }
        amt += n;
    }

    Ok(amt)
}
