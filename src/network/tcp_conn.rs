use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Socket timeouts for one connection. `Duration::ZERO` waits forever.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TcpConnConfig {
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

/// One accepted connection: the stream, where it came from, and the
/// timeouts its reads and writes honor.
#[derive(Debug)]
pub struct TcpConn<S = TcpStream> {
    stream: S,
    peer: SocketAddr,
    read_timeout: Duration,
    write_timeout: Duration,
}

async fn with_timeout<T>(
    limit: Duration,
    what: &'static str,
    fut: impl Future<Output = io::Result<T>>,
) -> io::Result<T> {
    if limit.is_zero() {
        return fut.await;
    }
    match timeout(limit, fut).await {
        Ok(res) => res,
        Err(_elapsed) => Err(io::Error::new(io::ErrorKind::TimedOut, what)),
    }
}

impl<S> TcpConn<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, peer: SocketAddr, cfg: TcpConnConfig) -> Self {
        Self {
            stream,
            peer,
            read_timeout: cfg.read_timeout,
            write_timeout: cfg.write_timeout,
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn write_timeout(&self) -> Duration {
        self.write_timeout
    }

    /// One read into `buf`; 0 means the peer closed its write half.
    pub async fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        with_timeout(self.read_timeout, "tcp read timeout", self.stream.read(buf)).await
    }

    /// Write the entire buffer.
    pub async fn send_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        with_timeout(
            self.write_timeout,
            "tcp write timeout",
            self.stream.write_all(bytes),
        )
        .await
    }

    /// Flush and close the write half so the peer sees EOF.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        with_timeout(self.write_timeout, "tcp shutdown timeout", self.stream.shutdown()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use tokio_test::io::Builder;

    fn peer() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 40000)
    }

    #[tokio::test]
    async fn reads_chunks_as_they_arrive_then_eof() {
        let mock = Builder::new().read(b"GET a").read(b".txt 0\n").build();
        let mut conn = TcpConn::new(mock, peer(), TcpConnConfig::default());
        let mut buf = [0u8; 64];

        let n = conn.read_chunk(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"GET a");
        let n = conn.read_chunk(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b".txt 0\n");
        assert_eq!(conn.read_chunk(&mut buf).await.unwrap(), 0);
        assert_eq!(conn.peer_addr(), peer());
    }

    #[tokio::test]
    async fn send_all_writes_every_byte() {
        let mock = Builder::new().write(b"404 File not found\n").build();
        let mut conn = TcpConn::new(mock, peer(), TcpConnConfig::default());
        conn.send_all(b"404 File not found\n").await.unwrap();
    }

    #[tokio::test]
    async fn read_error_surfaces() {
        let mock = Builder::new()
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let mut conn = TcpConn::new(mock, peer(), TcpConnConfig::default());
        let mut buf = [0u8; 8];
        let err = conn.read_chunk(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
    }

    #[tokio::test]
    async fn stalled_read_times_out_when_configured() {
        let (_silent_peer, stream) = tokio::io::duplex(64);
        let cfg = TcpConnConfig {
            read_timeout: Duration::from_millis(50),
            write_timeout: Duration::ZERO,
        };
        let mut conn = TcpConn::new(stream, peer(), cfg);
        let mut buf = [0u8; 8];
        let err = conn.read_chunk(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }
}
