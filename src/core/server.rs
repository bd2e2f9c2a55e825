use crate::config::Settings;
use crate::core::connection::{ConnectionHandler, HandlerLimits};
use crate::err::Result;
use crate::fs::{FileExecutor, FileStore, GlobalLock, ensure_storage_root};
use crate::global_var::LOGGER;
use crate::network::{ListenerHandle, TcpConn, TcpConnConfig, TcpListener};
use std::net::SocketAddr;
use std::sync::Arc;

/// A bound server accepting connections in the background.
#[derive(Debug)]
pub struct RunningServer {
    local_addr: SocketAddr,
    handle: ListenerHandle,
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await
    }
}

/// Prepare the storage root, bind, and start serving one task per connection.
pub async fn start(settings: &Settings) -> Result<RunningServer> {
    ensure_storage_root(&settings.root_dir)?;

    let executor = Arc::new(FileExecutor::new(
        FileStore::new(&settings.root_dir),
        Arc::new(GlobalLock::new()),
        settings.io_buffer_size,
    ));
    let conn_cfg = TcpConnConfig {
        read_timeout: settings.read_timeout,
        write_timeout: settings.write_timeout,
    };
    let limits = HandlerLimits {
        max_header_bytes: settings.max_header_bytes,
        io_buffer_size: settings.io_buffer_size,
    };

    let listener = TcpListener::bind_on(settings.bind_addr, settings.backlog)
        .await?
        .with_max_connections(settings.max_connections);
    let local_addr = listener.local_addr()?;

    let handle = listener.into_task(move |stream, peer| {
        let handler = ConnectionHandler::new(
            TcpConn::new(stream, peer, conn_cfg),
            executor.clone(),
            limits,
        );
        async move {
            handler.run().await;
        }
    });

    LOGGER.info(format!(
        "File server listening on {}, serving {}",
        local_addr,
        settings.root_dir.display()
    ));
    Ok(RunningServer { local_addr, handle })
}
