// SOCKS Protocol Version 5
// https://tools.ietf.org/html/rfc1928#section-4
//
// +----+-----+-------+------+----------+----------+
// |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
// +----+-----+-------+------+----------+----------+
// | 1  |  1  | X'00' |  1   | Variable |    2     |
// +----+-----+-------+------+----------+----------+
//
// https://tools.ietf.org/html/rfc1928#section-6
// +----+-----+-------+------+----------+----------+
// |VER | REP |  RSV  | ATYP | BND.ADDR | BND.PORT |
// +----+-----+-------+------+----------+----------+
// | 1  |  1  | X'00' |  1   | Variable |    2     |
// +----+-----+-------+------+----------+----------+
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{DecodeError, ValidationError};
use crate::socks::*;

use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Bind,
    UdpAssociate,
}

impl Command {
    pub fn from_u8(cmd: u8) -> Option<Self> {
        match cmd {
            SOCKS_CMD_CONNECT       => Some(Command::Connect),
            SOCKS_CMD_BIND          => Some(Command::Bind),
            SOCKS_CMD_UDP_ASSOCIATE => Some(Command::UdpAssociate),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Command::Connect      => SOCKS_CMD_CONNECT,
            Command::Bind         => SOCKS_CMD_BIND,
            Command::UdpAssociate => SOCKS_CMD_UDP_ASSOCIATE,
        }
    }
}

/// DST.ADDR / BND.ADDR, tagged by its ATYP.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    V4([u8; 4]),
    V6([u8; 16]),
    Domain(String),
}

impl Address {
    pub fn atyp(&self) -> u8 {
        match self {
            Address::V4(_)     => SOCKS_ATYP_IPV4,
            Address::V6(_)     => SOCKS_ATYP_IPV6,
            Address::Domain(_) => SOCKS_ATYP_DOMAIN_NAME,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Address::V4(octets)  => octets,
            Address::V6(octets)  => octets,
            Address::Domain(name) => name.as_bytes(),
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<IpAddr> for Address {
    fn from(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => Address::V4(v4.octets()),
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => Address::V4(v4.octets()),
                None => Address::V6(v6.octets()),
            },
        }
    }
}

/// Renders the host part of a `host:port` connect target.
impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::V4(octets)   => write!(f, "{}", Ipv4Addr::from(*octets)),
            Address::V6(octets)   => write!(f, "[{}]", Ipv6Addr::from(*octets)),
            Address::Domain(name) => f.write_str(name),
        }
    }
}

/// Encodes a port in network byte order.
pub fn port_to_bytes(port: u16) -> [u8; 2] {
    port.to_be_bytes()
}

/// Decodes a big endian port. A single byte is treated as the low byte.
pub fn port_from_bytes(bytes: &[u8]) -> u16 {
    match *bytes {
        [lo] => lo as u16,
        [hi, lo, ..] => u16::from_be_bytes([hi, lo]),
        [] => 0,
    }
}

/// A SOCKS5 request frame. Replies reuse the same layout with `command`
/// carrying the REP status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub version: u8,
    pub command: u8,
    pub address: Address,
    pub port: u16,
}

impl Request {
    pub fn new(command: Command, address: Address, port: u16) -> Self {
        Self { version: SOCKS_V5, command: command.as_u8(), address, port }
    }

    /// Reply carrying `status` and the server side bound address.
    pub fn reply(status: u8, bind_addr: SocketAddr) -> Self {
        Self {
            version: SOCKS_V5,
            command: status,
            address: Address::from(bind_addr.ip()),
            port: bind_addr.port(),
        }
    }

    /// Generic failure reply, bound to 0.0.0.0:0.
    pub fn failure() -> Self {
        Self {
            version: SOCKS_V5,
            command: SOCKS_REP_GENERAL_SERVER_FAILURE,
            address: Address::V4([0; 4]),
            port: 0,
        }
    }

    pub fn cmd(&self) -> Option<Command> {
        Command::from_u8(self.command)
    }

    /// Serializes the frame. Encoding never fails: the domain length prefix
    /// is a single byte, so a domain name longer than 255 bytes is cut to the
    /// longest prefix that fits on a character boundary, and the decoded frame
    /// then carries that shorter name.
    pub fn encode(&self) -> Vec<u8> {
        let addr = match &self.address {
            Address::Domain(name) => {
                let mut end = name.len().min(u8::MAX as usize);
                while !name.is_char_boundary(end) {
                    end -= 1;
                }
                &name.as_bytes()[..end]
            },
            other => other.as_bytes(),
        };

        let mut buf = Vec::with_capacity(SOCKS_HEADER_LEN + 1 + addr.len() + 2);
        buf.extend_from_slice(&[self.version, self.command, SOCKS_RSV, self.address.atyp()]);
        if let Address::Domain(_) = self.address {
            buf.push(addr.len() as u8);
        }
        buf.extend_from_slice(addr);
        buf.extend_from_slice(&port_to_bytes(self.port));
        buf
    }

    /// Parses and validates a client request.
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let request = Self::decode_frame(buf)?;
        request.validate()?;
        Ok(request)
    }

    /// Parses the byte layout without applying [`Request::validate`].
    ///
    /// A DOMAIN address must still be UTF-8 to be held as an [`Address`];
    /// anything else fails with `ValidationError::InvalidDomainName`.
    pub fn decode_frame(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < SOCKS_MIN_REQUEST_LEN {
            return Err(DecodeError::TooShort(buf.len()));
        }

        let version = buf[0];
        let command = buf[1];
        let atyp    = buf[3];

        let mut rest = &buf[SOCKS_HEADER_LEN..];
        let declared = match atyp {
            SOCKS_ATYP_DOMAIN_NAME => {
                let (&len, tail) = rest.split_first().ok_or(DecodeError::MissingAddressLength)?;
                rest = tail;
                len as usize
            },
            SOCKS_ATYP_IPV4 => 4,
            SOCKS_ATYP_IPV6 => 16,
            other => return Err(DecodeError::UnknownAddressType(other)),
        };

        // Last two bytes are the port.
        let remaining = rest.len().saturating_sub(2);
        if rest.len() < 2 || remaining != declared {
            return Err(DecodeError::InvalidAddressLength { declared, remaining });
        }

        let (addr, port) = rest.split_at(declared);
        let address = match atyp {
            SOCKS_ATYP_IPV4 => {
                let mut octets = [0u8; 4];
                octets.copy_from_slice(addr);
                Address::V4(octets)
            },
            SOCKS_ATYP_IPV6 => {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(addr);
                Address::V6(octets)
            },
            _ => {
                let name = String::from_utf8(addr.to_vec())
                    .map_err(|_| ValidationError::InvalidDomainName)?;
                Address::Domain(name)
            },
        };

        Ok(Self { version, command, address, port: port_from_bytes(port) })
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.version != SOCKS_V5 {
            return Err(ValidationError::UnsupportedVersion(self.version));
        }
        if self.command != SOCKS_CMD_CONNECT {
            return Err(ValidationError::UnsupportedCommand(self.command));
        }
        if self.address.is_empty() {
            return Err(ValidationError::MissingAddress);
        }
        // IPv6 only ever appears in replies.
        if let Address::V6(_) = self.address {
            return Err(ValidationError::UnsupportedAddressType(SOCKS_ATYP_IPV6));
        }
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }

        Ok(())
    }

    pub async fn write_to<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        writer.write_all(&self.encode()).await?;
        writer.flush().await
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ver: {} cmd: {} atyp: {} addr: {} port: {}",
            self.version,
            self.command,
            self.address.atyp(),
            self.address,
            self.port
        )
    }
}
