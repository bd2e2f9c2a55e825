use crate::error::ClientError;
use ferry_wire::constants::IO_BUFFER_SIZE;
use ferry_wire::{Command, Protocol, Request, ResponseDecoder, ResponseHeader};
use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

pub struct ConnectionConfig {
    pub connect_timeout: Option<Duration>,
    pub io_buffer_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: None,
            io_buffer_size: IO_BUFFER_SIZE,
        }
    }
}

/// A blocking connection carrying one request and its response.
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    config: ConnectionConfig,
}

impl Connection {
    pub fn open(peer: SocketAddr, config: Option<ConnectionConfig>) -> Result<Self, ClientError> {
        let config = config.unwrap_or_default();
        let stream = match config.connect_timeout {
            Some(limit) => TcpStream::connect_timeout(&peer, limit),
            None => TcpStream::connect(peer),
        }
        .map_err(|e| {
            ClientError::ConnectionError(format!("failed to connect to {}", peer), e.to_string())
        })?;

        Ok(Self {
            stream,
            peer,
            config,
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn io_buffer_size(&self) -> usize {
        self.config.io_buffer_size.max(1)
    }

    pub fn send_request(&mut self, request: &Request) -> Result<(), ClientError> {
        self.send_all(&request.serialize())
    }

    pub fn send_all(&mut self, bytes: &[u8]) -> Result<(), ClientError> {
        self.stream.write_all(bytes).map_err(|e| {
            ClientError::TransferError(String::from("failed to send data"), e.to_string())
        })
    }

    /// Signal the end of the request body.
    pub fn finish_writing(&mut self) -> Result<(), ClientError> {
        self.stream.shutdown(Shutdown::Write).map_err(|e| {
            ClientError::TransferError(String::from("failed to close request"), e.to_string())
        })
    }

    pub fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, ClientError> {
        self.stream.read(buf).map_err(|e| {
            ClientError::TransferError(String::from("failed to receive data"), e.to_string())
        })
    }

    /// Read until the response header is complete. Returns the header and any
    /// body bytes that came with it.
    pub fn read_response(
        &mut self,
        answering: Command,
    ) -> Result<(ResponseHeader, Vec<u8>), ClientError> {
        let mut decoder = ResponseDecoder::new(answering);
        let mut buf = vec![0u8; self.io_buffer_size()];
        loop {
            match decoder.decode() {
                Ok(Some(header)) => return Ok((header, decoder.take_leftover().to_vec())),
                Ok(None) => {}
                Err(e) => {
                    return Err(ClientError::ResponseParseError(
                        String::from("failed to parse response header"),
                        e.to_string(),
                    ));
                }
            }
            let n = self.read_chunk(&mut buf)?;
            if n == 0 {
                return Err(ClientError::ResponseParseError(
                    String::from("response ended early"),
                    decoder.finish().to_string(),
                ));
            }
            decoder.feed(&buf[..n]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::test_support::canned_server;
    use ferry_wire::{FileMeta, FileName, StatusCode};

    #[test]
    fn sends_request_and_reads_header_with_leftover() {
        let (addr, server) = canned_server(b"200 OK\n5\n1700000000\nhel".to_vec(), false);
        let mut conn = Connection::open(addr, None).unwrap();
        conn.send_request(&Request::Get {
            filename: FileName::new("a.txt").unwrap(),
            client_mtime: 0,
        })
        .unwrap();
        let (header, leftover) = conn.read_response(Command::Get).unwrap();
        assert_eq!(
            header.meta,
            Some(FileMeta {
                size: 5,
                mtime: 1_700_000_000
            })
        );
        assert_eq!(leftover, b"hel");
        assert_eq!(server.join().unwrap(), b"GET a.txt 0\n");
    }

    #[test]
    fn truncated_header_is_a_parse_error() {
        let (addr, server) = canned_server(b"200 OK\n5\n".to_vec(), false);
        let mut conn = Connection::open(addr, None).unwrap();
        conn.send_all(b"GET a.txt 0\n").unwrap();
        let err = conn.read_response(Command::Get).unwrap_err();
        assert!(matches!(err, ClientError::ResponseParseError(..)));
        server.join().unwrap();
    }

    #[test]
    fn garbage_status_is_a_parse_error() {
        let (addr, server) = canned_server(b"hello there\n".to_vec(), false);
        let mut conn = Connection::open(addr, None).unwrap();
        conn.send_all(b"DELETE a.txt\n").unwrap();
        let err = conn.read_response(Command::Delete).unwrap_err();
        assert!(err.to_string().starts_with("Invalid response"));
        server.join().unwrap();
    }

    #[test]
    fn status_only_answer_to_delete() {
        let (addr, server) = canned_server(b"404 File not found\n".to_vec(), false);
        let mut conn = Connection::open(addr, None).unwrap();
        conn.send_all(b"DELETE a.txt\n").unwrap();
        let (header, leftover) = conn.read_response(Command::Delete).unwrap();
        assert_eq!(header.status, StatusCode::NotFound);
        assert_eq!(header.message, "File not found");
        assert!(leftover.is_empty());
        server.join().unwrap();
    }

    #[test]
    fn refused_connection_is_reported() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = Connection::open(addr, None).err().expect("nothing listens");
        assert!(matches!(err, ClientError::ConnectionError(..)));
    }
}
