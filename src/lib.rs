#[macro_use]
extern crate log;
extern crate tokio;


pub mod socks;
pub mod error;
pub mod request;

/// socks5 server side: negotiation, request dispatch, outbound dial, relay
pub mod server;

pub use error::{DecodeError, Error, Result, ValidationError};
pub use request::{Address, Command, Request};
pub use server::{serve, serve_with};
