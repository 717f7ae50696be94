use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::request::Address;

use std::io;
use std::net::SocketAddr;
use std::time::Duration;


pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// A freshly established outbound connection.
#[derive(Debug)]
pub struct Outbound<T> {
    pub stream: T,
    /// Local end of `stream`, reported back to the client as BND.ADDR/BND.PORT.
    pub local_addr: SocketAddr,
}

/// Opens the outbound leg of a CONNECT.
///
/// The default is [`TcpDialer`]; tests and alternate transports plug in
/// their own implementation through `serve_with`.
#[async_trait]
pub trait Dialer: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    async fn dial(&self, addr: &Address, port: u16) -> io::Result<Outbound<Self::Stream>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpDialer {
    connect_timeout: Duration,
}

impl TcpDialer {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

impl Default for TcpDialer {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    type Stream = TcpStream;

    async fn dial(&self, addr: &Address, port: u16) -> io::Result<Outbound<TcpStream>> {
        let target = format!("{}:{}", addr, port);
        info!("connecting to {}", target);

        // Single attempt, no retry.
        let stream = match tokio::time::timeout(self.connect_timeout, TcpStream::connect(&target)).await {
            Ok(ret) => ret?,
            Err(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("connect to {} timed out after {:?}", target, self.connect_timeout),
                ));
            },
        };
        let _ = stream.set_nodelay(true);
        let local_addr = stream.local_addr()?;

        Ok(Outbound { stream, local_addr })
    }
}
