use crate::action::cache::LocalCache;
use crate::action::conn::Connection;
use crate::error::ClientError;
use ferry_wire::{BodyCursor, Command, FileMeta, FileName, Request, ResponseHeader, StatusCode};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetOutcome {
    Downloaded { path: PathBuf, meta: FileMeta },
    /// 304: the cached copy is current and was left untouched.
    UpToDate,
    /// Any other status; nothing local changed.
    NotServed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    /// The timestamp sent with the request; 0 when nothing was cached.
    pub client_mtime: i64,
    pub header: ResponseHeader,
    pub outcome: GetOutcome,
}

/// Conditional GET: fetch `name` unless the cached copy is current.
pub fn get_file(
    server: SocketAddr,
    cache: &LocalCache,
    name: &FileName,
) -> Result<Fetched, ClientError> {
    let client_mtime = cache.cached_mtime(name)?;

    let mut conn = Connection::open(server, None)?;
    conn.send_request(&Request::Get {
        filename: name.clone(),
        client_mtime,
    })?;
    let (header, leftover) = conn.read_response(Command::Get)?;

    let outcome = match (header.status, header.meta) {
        (StatusCode::Ok, Some(meta)) => GetOutcome::Downloaded {
            path: receive_body(&mut conn, cache, name, meta, &leftover)?,
            meta,
        },
        (StatusCode::NotModified, _) => GetOutcome::UpToDate,
        _ => GetOutcome::NotServed,
    };

    Ok(Fetched {
        client_mtime,
        header,
        outcome,
    })
}

fn receive_body(
    conn: &mut Connection,
    cache: &LocalCache,
    name: &FileName,
    meta: FileMeta,
    leftover: &[u8],
) -> Result<PathBuf, ClientError> {
    let mut download = cache.begin_download(name)?;
    let mut body = BodyCursor::new(meta.size);
    download.write(body.accept(leftover))?;

    let mut buf = vec![0u8; conn.io_buffer_size()];
    while !body.is_complete() {
        let want = body.read_len(buf.len());
        let n = conn.read_chunk(&mut buf[..want])?;
        if n == 0 {
            return Err(ClientError::TransferError(
                format!(
                    "connection closed after {} of {} bytes",
                    body.received(),
                    meta.size
                ),
                format!("GET {} from {}", name, conn.peer()),
            ));
        }
        download.write(body.accept(&buf[..n]))?;
    }
    download.commit(meta.mtime)
}
