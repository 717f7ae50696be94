use tokio::io::{self, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::oneshot;


/// Bytes moved in each direction by one relay.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    /// client -> outbound
    pub upstream: u64,
    /// outbound -> client
    pub downstream: u64,
}

/// Copies bytes both ways between `client` and `outbound`.
///
/// The outbound -> client leg runs on its own task. When it ends, the client
/// stream is shut down and the client -> outbound leg is cut, so the session
/// ends with the remote. If the client reaches EOF first, the outbound stream
/// is half-closed and the response keeps draining until the remote is done.
/// Both streams are dropped, and so closed, on return.
///
/// Copy errors end the affected leg and are logged; they are not failures of
/// the session.
pub async fn relay<C, T>(client: C, outbound: T) -> Transfer
where
    C: AsyncRead + AsyncWrite + Send + 'static,
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut client_r, mut client_w) = io::split(client);
    let (mut outbound_r, mut outbound_w) = io::split(outbound);

    let (done_tx, mut done_rx) = oneshot::channel::<io::Result<u64>>();
    let (abort_tx, abort_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let ret = tokio::select! {
            ret = io::copy(&mut outbound_r, &mut client_w) => ret,
            Ok(()) = abort_rx => Err(io::Error::new(io::ErrorKind::ConnectionAborted, "client leg failed")),
        };
        let _ = client_w.shutdown().await;
        drop(client_w);
        drop(outbound_r);
        let _ = done_tx.send(ret);
    });

    let mut transfer = Transfer::default();

    let (upstream, downstream) = tokio::select! {
        ret = pipe(&mut client_r, &mut outbound_w, &mut transfer.upstream) => {
            let _ = outbound_w.shutdown().await;
            // A failed client leg stops the other one too.
            if ret.is_err() {
                let _ = abort_tx.send(());
            }
            (ret, finished(done_rx.await))
        },
        ret = &mut done_rx => (Ok(()), finished(ret)),
    };
    drop(client_r);
    drop(outbound_w);

    if let Err(e) = upstream {
        debug!("relay client -> outbound ended: {}", e);
    }
    match downstream {
        Ok(n) => transfer.downstream = n,
        Err(e) => debug!("relay outbound -> client ended: {}", e),
    }
    debug!("relay finished, {} bytes up, {} bytes down", transfer.upstream, transfer.downstream);

    transfer
}

// Like `io::copy`, but the count lives outside the future so a leg that is
// cut short still reports what it moved.
async fn pipe<R, W>(reader: &mut R, writer: &mut W, total: &mut u64) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = vec![0u8; 8 * 1024];
    loop {
        let amt = reader.read(&mut buffer).await?;
        if amt == 0 {
            return Ok(());
        }
        writer.write_all(&buffer[..amt]).await?;
        writer.flush().await?;
        *total += amt as u64;
    }
}

fn finished(ret: Result<io::Result<u64>, oneshot::error::RecvError>) -> io::Result<u64> {
    match ret {
        Ok(ret) => ret,
        Err(_) => Err(io::Error::new(io::ErrorKind::Other, "relay task dropped")),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    #[tokio::test]
    async fn test_outbound_eof_closes_client() {
        let (mut client_peer, client) = io::duplex(1024);
        let (outbound, mut outbound_peer) = io::duplex(1024);
        let handle = tokio::spawn(relay(client, outbound));

        client_peer.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        outbound_peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        outbound_peer.write_all(b"pong").await.unwrap();
        drop(outbound_peer);

        // Only returns once the relay shut the client stream down.
        let mut response = Vec::new();
        client_peer.read_to_end(&mut response).await.unwrap();
        assert_eq!(response, b"pong");

        // The client is still connected and idle; the relay must not wait on it.
        let transfer = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("relay still running after remote EOF")
            .unwrap();
        assert_eq!(transfer, Transfer { upstream: 4, downstream: 4 });

        // Both halves are gone, so the client stream is fully closed.
        assert!(client_peer.write_all(b"late").await.is_err());
    }

    #[tokio::test]
    async fn test_outbound_eof_without_client_traffic() {
        let (client_peer, client) = io::duplex(1024);
        let (outbound, outbound_peer) = io::duplex(1024);
        let handle = tokio::spawn(relay(client, outbound));

        drop(outbound_peer);

        let transfer = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("relay still running after remote EOF")
            .unwrap();
        assert_eq!(transfer, Transfer::default());
        drop(client_peer);
    }

    #[tokio::test]
    async fn test_client_eof_lets_response_drain() {
        let (mut client_peer, client) = io::duplex(1024);
        let (outbound, mut outbound_peer) = io::duplex(1024);
        let handle = tokio::spawn(relay(client, outbound));

        client_peer.write_all(b"hello").await.unwrap();
        client_peer.shutdown().await.unwrap();

        let mut request = Vec::new();
        outbound_peer.read_to_end(&mut request).await.unwrap();
        assert_eq!(request, b"hello");

        outbound_peer.write_all(b"bye").await.unwrap();
        drop(outbound_peer);

        let mut response = Vec::new();
        client_peer.read_to_end(&mut response).await.unwrap();
        assert_eq!(response, b"bye");

        let transfer = handle.await.unwrap();
        assert_eq!(transfer, Transfer { upstream: 5, downstream: 3 });
    }

    #[tokio::test]
    async fn test_large_transfer_both_directions() {
        let (client_peer, client) = io::duplex(64);
        let (outbound, outbound_peer) = io::duplex(64);
        let handle = tokio::spawn(relay(client, outbound));

        let payload: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();

        let up = payload.clone();
        let (mut client_r, mut client_w) = io::split(client_peer);
        let writer = tokio::spawn(async move {
            client_w.write_all(&up).await.unwrap();
            client_w.shutdown().await.unwrap();
        });

        let (mut outbound_r, mut outbound_w) = io::split(outbound_peer);
        let echo = tokio::spawn(async move {
            io::copy(&mut outbound_r, &mut outbound_w).await.unwrap();
            outbound_w.shutdown().await.unwrap();
        });

        let mut echoed = Vec::new();
        client_r.read_to_end(&mut echoed).await.unwrap();
        assert_eq!(echoed, payload);

        writer.await.unwrap();
        echo.await.unwrap();
        let transfer = handle.await.unwrap();
        assert_eq!(transfer.upstream, payload.len() as u64);
        assert_eq!(transfer.downstream, payload.len() as u64);
    }
}
