use std::io;


pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a single SOCKS session.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid socks version specified by client: {0:#04x}")]
    UnsupportedVersion(u8),

    #[error("could not find a suitable method for authentication")]
    NoAcceptableMethod,

    #[error("malformed socks5 request: {0}")]
    Decode(#[from] DecodeError),

    #[error("unsupported socks5 command: {0:#04x}")]
    UnsupportedCommand(u8),
}

/// Why a request frame was rejected by the codec.
///
/// Framing variants describe a broken byte layout, `Invalid` wraps a frame
/// that parsed but failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("too few bytes to be a valid request: {0}")]
    TooShort(usize),

    #[error("missing address length")]
    MissingAddressLength,

    #[error("unknown address type: {0:#04x}")]
    UnknownAddressType(u8),

    #[error("invalid address length: {declared}, remaining bytes: {remaining}")]
    InvalidAddressLength { declared: usize, remaining: usize },

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("version not supported: {0:#04x}")]
    UnsupportedVersion(u8),

    #[error("command not understood: {0:#04x}")]
    UnsupportedCommand(u8),

    #[error("missing address")]
    MissingAddress,

    #[error("unsupported address type: {0:#04x}")]
    UnsupportedAddressType(u8),

    #[error("invalid port number")]
    InvalidPort,

    #[error("domain name is not valid utf-8")]
    InvalidDomainName,
}

impl DecodeError {
    pub fn is_framing(&self) -> bool {
        !matches!(self, DecodeError::Invalid(_))
    }
}
