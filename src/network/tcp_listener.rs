use crate::err::Result;
use crate::ferry_error_with_source;
use crate::global_var::LOGGER;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener as TokioTcpListener, TcpSocket, TcpStream};
use tokio::sync::{Semaphore, oneshot};
use tokio::task::JoinHandle;

/// Accepts TCP connections and runs each one on its own task.
pub struct TcpListener {
    listener: TokioTcpListener,
    /// Caps concurrently running connection tasks when set.
    limit: Option<Arc<Semaphore>>,
}

/// Handle to a running accept loop, allowing graceful shutdown.
#[derive(Debug)]
pub struct ListenerHandle {
    handle: JoinHandle<()>,
    shutdown_tx: oneshot::Sender<()>,
}

impl ListenerHandle {
    /// Stop accepting and wait for the accept loop to exit. Connections
    /// already being served run to completion.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown_tx.send(());
        let _ = self.handle.await;
        Ok(())
    }
}

impl TcpListener {
    /// Bind `addr` with `SO_REUSEADDR` and the given listen backlog.
    pub async fn bind_on(addr: SocketAddr, backlog: u32) -> Result<Self> {
        LOGGER.info(format!("Binding TCP listener to {}", addr));
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket
            .bind(addr)
            .map_err(|e| ferry_error_with_source!(e, "cannot bind {}", addr))?;
        let listener = socket.listen(backlog)?;
        Ok(Self {
            listener,
            limit: None,
        })
    }

    /// Serve at most `max` connections at once; `None` lifts the bound.
    pub fn with_max_connections(mut self, max: Option<usize>) -> Self {
        self.limit = max.map(|n| Arc::new(Semaphore::new(n.max(1))));
        self
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Start the accept loop in a background task. `on_conn` builds the
    /// future serving one connection; each runs on a task of its own.
    pub fn into_task<F, Fut>(self, mut on_conn: F) -> ListenerHandle
    where
        F: FnMut(TcpStream, SocketAddr) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            loop {
                let permit = match &self.limit {
                    None => None,
                    Some(sem) => tokio::select! {
                        biased;
                        _ = &mut shutdown_rx => break,
                        permit = sem.clone().acquire_owned() => permit.ok(),
                    },
                };
                tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => break,
                    res = self.listener.accept() => {
                        match res {
                            Ok((stream, peer)) => {
                                LOGGER.debug(format!("Accepted TCP connection from {}", peer));
                                let serve = on_conn(stream, peer);
                                tokio::spawn(async move {
                                    let _permit = permit;
                                    serve.await;
                                });
                            }
                            Err(e) => {
                                LOGGER.warn(format!("Failed to accept TCP connection: {}", e));
                                continue;
                            }
                        }
                    }
                }
            }
            LOGGER.info("Tcp listener received shutdown signal, exiting...");
        });
        ListenerHandle {
            handle,
            shutdown_tx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::time::{sleep, timeout};

    fn loopback() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }

    #[tokio::test]
    async fn accepts_one_connection_and_reads_payload() -> Result<()> {
        let listener = TcpListener::bind_on(loopback(), 16).await?;
        let dest = listener.local_addr()?;

        let (tx, rx) = oneshot::channel::<Vec<u8>>();
        let mut tx_opt = Some(tx);
        let handle = listener.into_task(move |mut stream, _peer| {
            let tx = tx_opt.take();
            async move {
                let mut buf = Vec::new();
                let _ = stream.read_to_end(&mut buf).await;
                if let Some(tx) = tx {
                    let _ = tx.send(buf);
                }
            }
        });

        let mut client = TcpStream::connect(dest).await?;
        client.write_all(b"hello-tcp").await?;
        client.shutdown().await?;

        let got = rx.await.expect("listener should forward payload");
        assert_eq!(&got[..], b"hello-tcp");

        handle.shutdown().await?;
        Ok(())
    }

    #[tokio::test]
    async fn max_connections_defers_extra_handlers() -> Result<()> {
        let listener = TcpListener::bind_on(loopback(), 16)
            .await?
            .with_max_connections(Some(1));
        let dest = listener.local_addr()?;

        let started = Arc::new(AtomicUsize::new(0));
        let counter = started.clone();
        let handle = listener.into_task(move |mut stream, _peer| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = Vec::new();
                let _ = stream.read_to_end(&mut buf).await;
            }
        });

        let first = TcpStream::connect(dest).await?;
        let _second = TcpStream::connect(dest).await?;
        sleep(Duration::from_millis(150)).await;
        assert_eq!(started.load(Ordering::SeqCst), 1);

        drop(first);
        timeout(Duration::from_secs(2), async {
            while started.load(Ordering::SeqCst) < 2 {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("second handler should start once the first finished");

        handle.shutdown().await?;
        Ok(())
    }

    #[tokio::test]
    async fn shutdown_stops_accepting() -> Result<()> {
        let listener = TcpListener::bind_on(loopback(), 16).await?;
        let dest = listener.local_addr()?;
        let handle = listener.into_task(|_stream, _peer| async {});
        handle.shutdown().await?;
        assert!(TcpStream::connect(dest).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn binding_a_taken_port_fails() -> Result<()> {
        let first = TcpListener::bind_on(loopback(), 16).await?;
        let taken = first.local_addr()?;
        assert!(TcpListener::bind_on(taken, 16).await.is_err());
        Ok(())
    }
}
