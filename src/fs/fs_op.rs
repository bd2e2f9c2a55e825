use crate::fs::fs_lock::LockPolicy;
use crate::fs::store::FileStore;
use crate::global_var::LOGGER;
use crate::network::TcpConn;
use bytes::Bytes;
use ferry_wire::{
    BodyCursor, Command, FileName, Protocol, Request, ResponseHeader, StatusCode, messages,
};
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Why a file operation did not complete normally.
#[derive(Debug)]
pub enum FileOpError {
    NotFound,
    Metadata(io::Error),
    Open(io::Error),
    Create(io::Error),
    Write(io::Error),
    Incomplete { expected: u64, received: u64 },
    Delete(io::Error),
    /// The peer connection failed; nothing more can be said to it.
    Transport(io::Error),
    /// The stored file failed after its 200 header went out.
    Stream(io::Error),
}

impl FileOpError {
    /// The status-only response owed to the peer, if the connection is still usable.
    pub fn response(&self) -> Option<ResponseHeader> {
        let (status, message) = match self {
            FileOpError::NotFound => (StatusCode::NotFound, messages::NOT_FOUND),
            FileOpError::Metadata(_) => (StatusCode::InternalError, messages::STAT_FAILED),
            FileOpError::Open(_) => (StatusCode::InternalError, messages::OPEN_FAILED),
            FileOpError::Create(_) => (StatusCode::InternalError, messages::CREATE_FAILED),
            FileOpError::Write(_) => (StatusCode::InternalError, messages::WRITE_FAILED),
            FileOpError::Incomplete { .. } => (StatusCode::InternalError, messages::INCOMPLETE),
            FileOpError::Delete(_) => (StatusCode::InternalError, messages::DELETE_FAILED),
            FileOpError::Transport(_) | FileOpError::Stream(_) => return None,
        };
        Some(ResponseHeader::new(status, message))
    }
}

impl Display for FileOpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOpError::NotFound => write!(f, "{}", messages::NOT_FOUND),
            FileOpError::Metadata(e) => write!(f, "{} ({})", messages::STAT_FAILED, e),
            FileOpError::Open(e) => write!(f, "{} ({})", messages::OPEN_FAILED, e),
            FileOpError::Create(e) => write!(f, "{} ({})", messages::CREATE_FAILED, e),
            FileOpError::Write(e) => write!(f, "{} ({})", messages::WRITE_FAILED, e),
            FileOpError::Incomplete { expected, received } => {
                write!(f, "Incomplete transfer ({}/{} bytes)", received, expected)
            }
            FileOpError::Delete(e) => write!(f, "{} ({})", messages::DELETE_FAILED, e),
            FileOpError::Transport(e) => write!(f, "connection failed: {}", e),
            FileOpError::Stream(e) => write!(f, "stored file failed mid-body: {}", e),
        }
    }
}

impl std::error::Error for FileOpError {}

/// One line of operator log per executed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpReport {
    pub command: Command,
    pub filename: FileName,
    /// `None` when the connection was abandoned without a response.
    pub status: Option<StatusCode>,
    pub detail: String,
}

impl OpReport {
    fn answered(command: Command, filename: FileName, status: StatusCode, detail: String) -> Self {
        Self {
            command,
            filename,
            status: Some(status),
            detail,
        }
    }

    fn aborted(command: Command, filename: FileName, detail: String) -> Self {
        Self {
            command,
            filename,
            status: None,
            detail,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, None | Some(StatusCode::InternalError))
    }
}

impl Display for OpReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(
                f,
                "{} {}: {} {}",
                self.command, self.filename, status, self.detail
            ),
            None => write!(
                f,
                "{} {}: aborted, {}",
                self.command, self.filename, self.detail
            ),
        }
    }
}

/// What an operation leaves for the caller to send once the lock is gone.
struct Reply {
    header: ResponseHeader,
    /// The header (and body) already went out under the lock.
    sent: bool,
    detail: String,
}

impl Reply {
    fn status(status: StatusCode, message: &str, detail: String) -> Self {
        Self {
            header: ResponseHeader::new(status, message),
            sent: false,
            detail,
        }
    }
}

/// A file being uploaded. Failed uploads are removed through
/// [`PartialUpload::discard`]; dropping it unsettled only happens when the
/// operation itself is cancelled.
struct PartialUpload {
    path: PathBuf,
    settled: bool,
}

impl PartialUpload {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            settled: false,
        }
    }

    fn commit(mut self) {
        self.settled = true;
    }

    async fn discard(mut self) {
        self.settled = true;
        log_removal(&self.path, tokio::fs::remove_file(&self.path).await);
    }
}

fn log_removal(path: &Path, result: io::Result<()>) {
    match result {
        Ok(()) => LOGGER.debug(format!("Removed partial upload {}", path.display())),
        Err(e) => LOGGER.error(format!(
            "Failed to remove partial upload {}: {}",
            path.display(),
            e
        )),
    }
}

impl Drop for PartialUpload {
    fn drop(&mut self) {
        // No runtime to await on here; a single unlink is short enough to block.
        if !self.settled {
            log_removal(&self.path, std::fs::remove_file(&self.path));
        }
    }
}

/// Runs GET, PUT and DELETE against the store, each under the lock policy.
#[derive(Debug, Clone)]
pub struct FileExecutor {
    store: FileStore,
    lock: Arc<dyn LockPolicy>,
    io_buffer_size: usize,
}

impl FileExecutor {
    pub fn new(store: FileStore, lock: Arc<dyn LockPolicy>, io_buffer_size: usize) -> Self {
        Self {
            store,
            lock,
            io_buffer_size: io_buffer_size.max(1),
        }
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    /// Carry out `request` and answer it on `conn`. `leftover` holds the bytes
    /// that arrived behind the header in the same reads.
    pub async fn execute<S>(
        &self,
        request: Request,
        leftover: Bytes,
        conn: &mut TcpConn<S>,
    ) -> OpReport
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let command = request.command();
        let filename = request.filename().clone();

        let outcome = match &request {
            Request::Get {
                filename,
                client_mtime,
            } => self.get(filename, *client_mtime, conn).await,
            Request::Put { filename, size } => self.put(filename, *size, leftover, conn).await,
            Request::Delete { filename } => self.delete(filename).await,
        };

        let (header, report) = match outcome {
            Ok(reply) if reply.sent => {
                return OpReport::answered(command, filename, reply.header.status, reply.detail);
            }
            Ok(reply) => {
                let status = reply.header.status;
                (
                    reply.header,
                    OpReport::answered(command, filename.clone(), status, reply.detail),
                )
            }
            Err(err) => match err.response() {
                Some(header) => {
                    let status = header.status;
                    (
                        header,
                        OpReport::answered(command, filename.clone(), status, err.to_string()),
                    )
                }
                None => return OpReport::aborted(command, filename, err.to_string()),
            },
        };

        if let Err(e) = conn.send_all(&header.serialize()).await {
            return OpReport::aborted(
                command,
                filename,
                format!("{}, failed to send response: {}", report.detail, e),
            );
        }
        report
    }

    async fn get<S>(
        &self,
        filename: &FileName,
        client_mtime: i64,
        conn: &mut TcpConn<S>,
    ) -> Result<Reply, FileOpError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let _guard = self.lock.acquire(filename).await;

        let meta = self
            .store
            .stat(filename)
            .await
            .map_err(FileOpError::Metadata)?
            .ok_or(FileOpError::NotFound)?;

        if client_mtime > 0 && meta.mtime <= client_mtime {
            return Ok(Reply::status(
                StatusCode::NotModified,
                messages::NOT_MODIFIED,
                messages::NOT_MODIFIED.to_string(),
            ));
        }

        let mut file = File::open(self.store.path_of(filename))
            .await
            .map_err(FileOpError::Open)?;

        let header = ResponseHeader::file(meta);
        conn.send_all(&header.serialize())
            .await
            .map_err(FileOpError::Transport)?;

        let mut body = BodyCursor::new(meta.size);
        let mut buf = vec![0u8; self.io_buffer_size];
        while !body.is_complete() {
            let want = body.read_len(buf.len());
            let n = file
                .read(&mut buf[..want])
                .await
                .map_err(FileOpError::Stream)?;
            if n == 0 {
                return Err(FileOpError::Stream(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("file ended after {} of {} bytes", body.received(), meta.size),
                )));
            }
            let chunk = body.accept(&buf[..n]);
            conn.send_all(chunk)
                .await
                .map_err(FileOpError::Transport)?;
        }

        Ok(Reply {
            header,
            sent: true,
            detail: format!(
                "{} (size: {} bytes, mtime: {})",
                messages::OK,
                meta.size,
                meta.mtime
            ),
        })
    }

    async fn put<S>(
        &self,
        filename: &FileName,
        size: u64,
        leftover: Bytes,
        conn: &mut TcpConn<S>,
    ) -> Result<Reply, FileOpError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let _guard = self.lock.acquire(filename).await;

        let path = self.store.path_of(filename);
        let mut file = File::create(&path).await.map_err(FileOpError::Create)?;
        let partial = PartialUpload::new(path);

        let surplus = match self.receive_upload(&mut file, size, leftover, conn).await {
            Ok(surplus) => {
                drop(file);
                partial.commit();
                surplus
            }
            Err(err) => {
                drop(file);
                partial.discard().await;
                return Err(err);
            }
        };

        if surplus > 0 {
            LOGGER.warn(format!(
                "PUT {}: discarded {} bytes beyond the declared size",
                filename, surplus
            ));
        }

        Ok(Reply::status(
            StatusCode::Ok,
            messages::UPLOADED,
            format!("{} ({} bytes written)", messages::OK, size),
        ))
    }

    /// Fill `file` with exactly `size` bytes: `leftover` first, then the
    /// connection. Returns how many leftover bytes lay beyond the body.
    async fn receive_upload<S>(
        &self,
        file: &mut File,
        size: u64,
        leftover: Bytes,
        conn: &mut TcpConn<S>,
    ) -> Result<usize, FileOpError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let mut body = BodyCursor::new(size);
        let head = body.accept(&leftover);
        let surplus = leftover.len() - head.len();
        file.write_all(head).await.map_err(FileOpError::Write)?;

        let mut buf = vec![0u8; self.io_buffer_size];
        while !body.is_complete() {
            let want = body.read_len(buf.len());
            let n = conn
                .read_chunk(&mut buf[..want])
                .await
                .map_err(FileOpError::Transport)?;
            if n == 0 {
                return Err(FileOpError::Incomplete {
                    expected: size,
                    received: body.received(),
                });
            }
            let chunk = body.accept(&buf[..n]);
            file.write_all(chunk).await.map_err(FileOpError::Write)?;
        }
        file.flush().await.map_err(FileOpError::Write)?;
        Ok(surplus)
    }

    async fn delete(&self, filename: &FileName) -> Result<Reply, FileOpError> {
        let _guard = self.lock.acquire(filename).await;

        self.store
            .stat(filename)
            .await
            .map_err(FileOpError::Metadata)?
            .ok_or(FileOpError::NotFound)?;

        tokio::fs::remove_file(self.store.path_of(filename))
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => FileOpError::NotFound,
                _ => FileOpError::Delete(e),
            })?;

        Ok(Reply::status(
            StatusCode::Ok,
            messages::DELETED,
            messages::OK.to_string(),
        ))
    }
}
