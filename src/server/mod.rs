pub mod dialer;
pub mod dispatch;
pub mod handshake;
pub mod relay;

mod listener;
mod socks5;

pub use self::dialer::{Dialer, Outbound, TcpDialer, DEFAULT_CONNECT_TIMEOUT};
pub use self::listener::{ServerConfig, SocksServer};
pub use self::relay::{relay, Transfer};
pub use self::socks5::{serve, serve_with};
