use crate::action::cache::LocalCache;
use crate::action::conn::Connection;
use crate::error::ClientError;
use ferry_wire::{BodyCursor, Command, FileName, Request, ResponseHeader};
use std::fs::File;
use std::io::Read;
use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uploaded {
    /// Body bytes actually sent.
    pub sent: u64,
    pub header: ResponseHeader,
}

/// Upload the cached copy of `name`. Fails locally, before connecting, when
/// there is no such file.
pub fn put_file(
    server: SocketAddr,
    cache: &LocalCache,
    name: &FileName,
) -> Result<Uploaded, ClientError> {
    let path = cache.path_of(name);
    let meta = cache.meta(name)?.ok_or_else(|| {
        ClientError::LocalFileError(
            format!("local file not found: {}", path.display()),
            String::new(),
        )
    })?;
    let mut file = File::open(&path).map_err(|e| {
        ClientError::LocalFileError(format!("cannot open {}", path.display()), e.to_string())
    })?;

    let mut conn = Connection::open(server, None)?;
    conn.send_request(&Request::Put {
        filename: name.clone(),
        size: meta.size,
    })?;

    let mut body = BodyCursor::new(meta.size);
    let mut buf = vec![0u8; conn.io_buffer_size()];
    while !body.is_complete() {
        let want = body.read_len(buf.len());
        let n = file.read(&mut buf[..want]).map_err(|e| {
            ClientError::LocalFileError(format!("cannot read {}", path.display()), e.to_string())
        })?;
        if n == 0 {
            // The file shrank since it was measured; the server will see a short body.
            break;
        }
        conn.send_all(body.accept(&buf[..n]))?;
    }
    conn.finish_writing()?;

    let (header, _) = conn.read_response(Command::Put)?;
    Ok(Uploaded {
        sent: body.received(),
        header,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::test_support::{ScratchDir, canned_server};
    use ferry_wire::StatusCode;
    use std::net::TcpListener;

    fn name(s: &str) -> FileName {
        FileName::new(s).unwrap()
    }

    #[test]
    fn uploads_header_then_body() {
        let tmp = ScratchDir::new("put_upload");
        let cache = LocalCache::open(tmp.path()).unwrap();
        std::fs::write(cache.path_of(&name("a.txt")), b"hello").unwrap();

        let (addr, server) = canned_server(b"200 File uploaded successfully\n".to_vec(), true);
        let uploaded = put_file(addr, &cache, &name("a.txt")).unwrap();

        assert_eq!(server.join().unwrap(), b"PUT a.txt\n5\nhello");
        assert_eq!(uploaded.sent, 5);
        assert_eq!(uploaded.header.status, StatusCode::Ok);
        assert_eq!(uploaded.header.message, "File uploaded successfully");
    }

    #[test]
    fn missing_local_file_never_connects() {
        let tmp = ScratchDir::new("put_missing");
        let cache = LocalCache::open(tmp.path()).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();

        let err = put_file(listener.local_addr().unwrap(), &cache, &name("ghost.txt")).unwrap_err();

        assert!(matches!(err, ClientError::LocalFileError(..)));
        assert_eq!(
            listener.accept().unwrap_err().kind(),
            std::io::ErrorKind::WouldBlock
        );
    }
}
