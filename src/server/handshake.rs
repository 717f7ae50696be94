// https://tools.ietf.org/html/rfc1928#section-3
// +----+----------+----------+
// |VER | NMETHODS | METHODS  |
// +----+----------+----------+
// | 1  |    1     | 1 to 255 |
// +----+----------+----------+
//
// +----+--------+
// |VER | METHOD |
// +----+--------+
// | 1  |   1    |
// +----+--------+
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::socks::*;


/// Reads the client greeting and accepts "no authentication required" if it
/// was offered.
///
/// On `Error::NoAcceptableMethod` nothing has been written back; the caller
/// decides whether to send the `X'FF'` reply (see [`reject`]).
pub async fn negotiate<S>(stream: &mut S) -> Result<u8>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut header = [0u8; 2];
    stream.read_exact(&mut header).await?;

    let (ver, n_methods) = (header[0], header[1]);
    if ver != SOCKS_V5 {
        return Err(Error::UnsupportedVersion(ver));
    }

    let mut methods = vec![0u8; n_methods as usize];
    stream.read_exact(&mut methods).await?;

    if !methods.iter().any(|&m| m == SOCKS_METHOD_NO_AUTH) {
        return Err(Error::NoAcceptableMethod);
    }

    stream.write_all(&[SOCKS_V5, SOCKS_METHOD_NO_AUTH]).await?;
    stream.flush().await?;
    debug!("socks5 auth method negotiated: {:#04x}", SOCKS_METHOD_NO_AUTH);

    Ok(SOCKS_METHOD_NO_AUTH)
}

/// Tells the client that none of its methods are acceptable.
pub async fn reject<S>(stream: &mut S) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(&[SOCKS_V5, SOCKS_METHOD_NO_ACCEPTABLE]).await?;
    stream.flush().await?;
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    async fn run(greeting: &[u8]) -> (Result<u8>, Vec<u8>) {
        let (mut client, mut server) = tokio::io::duplex(1024);
        client.write_all(greeting).await.unwrap();

        let ret = negotiate(&mut server).await;
        drop(server);

        let mut written = Vec::new();
        client.read_to_end(&mut written).await.unwrap();
        (ret, written)
    }

    #[tokio::test]
    async fn test_accepts_no_auth_among_many() {
        let (ret, written) = run(&[0x05, 0x05, 0x04, 0x03, 0x02, 0x01, 0x00]).await;
        assert_eq!(ret.unwrap(), SOCKS_METHOD_NO_AUTH);
        assert_eq!(written, vec![0x05, 0x00]);
    }

    #[tokio::test]
    async fn test_methods_without_no_auth() {
        let (ret, written) = run(&[0x05, 0x02, 0x01, 0x02]).await;
        assert!(matches!(ret, Err(Error::NoAcceptableMethod)));
        assert!(written.is_empty());
    }

    #[tokio::test]
    async fn test_zero_methods() {
        let (ret, written) = run(&[0x05, 0x00]).await;
        assert!(matches!(ret, Err(Error::NoAcceptableMethod)));
        assert!(written.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_version() {
        let (ret, written) = run(&[0x04, 0x01, 0x00]).await;
        assert!(matches!(ret, Err(Error::UnsupportedVersion(0x04))));
        assert!(written.is_empty());
    }

    #[tokio::test]
    async fn test_truncated_method_list() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(&[0x05, 0x03, 0x00]).await.unwrap();
        drop(client);

        let ret = negotiate(&mut server).await;
        assert!(matches!(ret, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_reject_reply() {
        let (mut client, mut server) = tokio::io::duplex(64);
        reject(&mut server).await.unwrap();

        let mut buf = [0u8; 2];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [0x05, 0xff]);
    }
}
