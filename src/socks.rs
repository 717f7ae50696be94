// SOCKS Protocol Version 5
// https://tools.ietf.org/html/rfc1928


// SOCKS5 CONNECT command
// SOCKS5 BIND / UDP ASSOCIATE commands are recognized but never executed.

pub const SOCKS_V5: u8 = 0x05;

pub const SOCKS_CMD_CONNECT: u8       = 0x01;
pub const SOCKS_CMD_BIND: u8          = 0x02;
pub const SOCKS_CMD_UDP_ASSOCIATE: u8 = 0x03;

pub const SOCKS_RSV: u8 = 0x00;

// SOCKS-5 Reply Code:
//
// o  X'00' succeeded
// o  X'01' general SOCKS server failure
// o  X'02' connection not allowed by ruleset
// o  X'03' Network unreachable
// o  X'04' Host unreachable
// o  X'05' Connection refused
// o  X'06' TTL expired
// o  X'07' Command not supported
// o  X'08' Address type not supported
// o  X'09' to X'FF' unassigned
pub const SOCKS_REP_SUCCEEDED: u8                         = 0x00;
pub const SOCKS_REP_GENERAL_SERVER_FAILURE: u8            = 0x01;
pub const SOCKS_REP_CONNECTION_NOT_ALLOWED_BY_RULESET: u8 = 0x02;
pub const SOCKS_REP_NETWORK_UNREACHABLE: u8               = 0x03;
pub const SOCKS_REP_HOST_UNREACHABLE: u8                  = 0x04;
pub const SOCKS_REP_CONNECTION_REFUSED: u8                = 0x05;
pub const SOCKS_REP_TTL_EXPIRED: u8                       = 0x06;
pub const SOCKS_REP_COMMAND_NOT_SUPPORTED: u8             = 0x07;
pub const SOCKS_REP_ADDRESS_TYPE_NOT_SUPPORTED: u8        = 0x08;

// ATYP   address type of following address
//
//     o  IP V4 address: X'01'
//     o  DOMAINNAME: X'03'
//     o  IP V6 address: X'04'
pub const SOCKS_ATYP_IPV4: u8        = 0x01;
pub const SOCKS_ATYP_DOMAIN_NAME: u8 = 0x03;
pub const SOCKS_ATYP_IPV6: u8        = 0x04;

// The values currently defined for METHOD are:
//
//       o  X'00' NO AUTHENTICATION REQUIRED
//       o  X'01' GSSAPI
//       o  X'02' USERNAME/PASSWORD
//       o  X'03' to X'7F' IANA ASSIGNED
//       o  X'80' to X'FE' RESERVED FOR PRIVATE METHODS
//       o  X'FF' NO ACCEPTABLE METHODS
pub const SOCKS_METHOD_NO_AUTH: u8       = 0x00;
pub const SOCKS_METHOD_GSSAPI: u8        = 0x01;
pub const SOCKS_METHOD_PASSWD_AUTH: u8   = 0x02;
pub const SOCKS_METHOD_NO_ACCEPTABLE: u8 = 0xFF;

// VER + CMD + RSV + ATYP
pub const SOCKS_HEADER_LEN: usize = 4;
// Fixed header, domain length byte, longest domain, port.
pub const SOCKS_MAX_REQUEST_LEN: usize = SOCKS_HEADER_LEN + 1 + u8::MAX as usize + 2;
// Shortest frame the codec will look at: header, a length byte and a port.
pub const SOCKS_MIN_REQUEST_LEN: usize = 7;
