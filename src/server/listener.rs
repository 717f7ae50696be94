use tokio::net::TcpListener;

use super::dialer::{Dialer, TcpDialer, DEFAULT_CONNECT_TIMEOUT};
use super::socks5::serve_with;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;


#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ServerConfig {
    /// socks server listen addr
    pub bind_addr: SocketAddr,
    /// upper bound for each outbound connect
    pub connect_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 1080)),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}


/// Accept loop handing every connection to its own SOCKS5 session task.
pub struct SocksServer<D = TcpDialer> {
    listener: TcpListener,
    dialer: Arc<D>,
}

impl SocksServer<TcpDialer> {
    pub async fn new(config: ServerConfig) -> io::Result<Self> {
        Self::with_dialer(config.bind_addr, TcpDialer::new(config.connect_timeout)).await
    }
}

impl<D: Dialer + 'static> SocksServer<D> {
    pub async fn with_dialer(bind_addr: SocketAddr, dialer: D) -> io::Result<Self> {
        let listener = TcpListener::bind(bind_addr).await?;
        info!("tcp listener listening at {:?}.", listener.local_addr()?);

        Ok(Self { listener, dialer: Arc::new(dialer) })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run_forever(&self) -> io::Result<()> {
        loop {
            let (stream, peer_addr) = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("accept error: {}", e);
                    continue;
                },
            };
            info!("got socks connection {:?}", peer_addr);

            let dialer = self.dialer.clone();
            tokio::spawn(async move {
                let _ = stream.set_nodelay(true);
                if let Err(e) = serve_with(stream, &*dialer).await {
                    error!("socks connection {} error: {}", peer_addr, e);
                }
            });
        }
    }
}
