// SOCKS Protocol Version 5
// https://tools.ietf.org/html/rfc1928
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;
use crate::request::Request;
use crate::socks::*;

use super::dialer::{Dialer, Outbound, TcpDialer};
use super::dispatch::{dispatch, read_request};
use super::handshake;
use super::relay::relay;


enum Phase<T> {
    Handshake,
    Request,
    Connect(Request),
    Reply(Outbound<T>),
}

/// Runs one SOCKS5 session on `stream`, dialing out over TCP.
pub async fn serve<S>(stream: S) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    serve_with(stream, &TcpDialer::default()).await
}

/// Runs one SOCKS5 session on `stream`, opening the outbound leg with `dialer`.
///
/// Negotiation and request failures are answered with a single failure reply
/// before the error is returned. Once the success reply is out the session
/// only relays, and it ends with `Ok(())` whatever happens on the wire.
/// `stream` and the outbound stream are closed when this returns.
pub async fn serve_with<S, D>(mut stream: S, dialer: &D) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    D: Dialer,
{
    let mut phase = Phase::Handshake;

    let outbound = loop {
        phase = match phase {
            Phase::Handshake => match handshake::negotiate(&mut stream).await {
                Ok(_) => Phase::Request,
                Err(e) => {
                    let _ = handshake::reject(&mut stream).await;
                    return Err(e);
                },
            },
            Phase::Request => match read_request(&mut stream).await {
                Ok(request) => Phase::Connect(request),
                Err(e) => {
                    fail_request(&mut stream).await;
                    return Err(e);
                },
            },
            Phase::Connect(request) => match dispatch(&request, dialer).await {
                Ok(outbound) => Phase::Reply(outbound),
                Err(e) => {
                    fail_request(&mut stream).await;
                    return Err(e);
                },
            },
            Phase::Reply(outbound) => {
                // The outbound stream is dropped unused if the client is gone.
                Request::reply(SOCKS_REP_SUCCEEDED, outbound.local_addr)
                    .write_to(&mut stream)
                    .await?;
                break outbound.stream;
            },
        };
    };

    relay(stream, outbound).await;

    Ok(())
}

async fn fail_request<S>(stream: &mut S)
where
    S: AsyncWrite + Unpin,
{
    if let Err(e) = Request::failure().write_to(stream).await {
        debug!("failed to send socks5 failure reply: {}", e);
    }
}
