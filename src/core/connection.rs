use crate::fs::{FileExecutor, OpReport};
use crate::global_var::LOGGER;
use crate::network::TcpConn;
use ferry_wire::{Protocol, ProtocolError, Request, RequestDecoder, ResponseHeader};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Buffer bounds for one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerLimits {
    pub max_header_bytes: usize,
    pub io_buffer_size: usize,
}

/// How a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Served {
    /// The peer closed before sending anything.
    Idle,
    /// The header did not decode; a 400 went back.
    Rejected(ProtocolError),
    Executed(OpReport),
    /// The transport failed before a request was decoded.
    Aborted(String),
}

enum HandlerState {
    AwaitRequest,
    Parse,
    Dispatch(Request),
    Respond(ResponseHeader),
    Close,
}

/// Serves exactly one request on one connection, then closes it.
pub struct ConnectionHandler<S = TcpStream> {
    conn: TcpConn<S>,
    decoder: RequestDecoder,
    executor: Arc<FileExecutor>,
    io_buffer_size: usize,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(conn: TcpConn<S>, executor: Arc<FileExecutor>, limits: HandlerLimits) -> Self {
        Self {
            conn,
            decoder: RequestDecoder::new(limits.max_header_bytes),
            executor,
            io_buffer_size: limits.io_buffer_size.max(1),
        }
    }

    pub async fn run(mut self) -> Served {
        let peer = self.conn.peer_addr();
        let mut buf = vec![0u8; self.io_buffer_size];
        let mut received = 0usize;
        let mut served = Served::Idle;
        let mut state = HandlerState::AwaitRequest;

        loop {
            state = match state {
                HandlerState::AwaitRequest => match self.conn.read_chunk(&mut buf).await {
                    Ok(0) if received == 0 => HandlerState::Close,
                    Ok(0) => {
                        let err = self.decoder.finish();
                        let header = ResponseHeader::rejection(&err);
                        served = Served::Rejected(err);
                        HandlerState::Respond(header)
                    }
                    Ok(n) => {
                        received += n;
                        self.decoder.feed(&buf[..n]);
                        HandlerState::Parse
                    }
                    Err(e) => {
                        served = Served::Aborted(format!("read failed: {}", e));
                        HandlerState::Close
                    }
                },
                HandlerState::Parse => match self.decoder.decode() {
                    Ok(Some(request)) => HandlerState::Dispatch(request),
                    Ok(None) => HandlerState::AwaitRequest,
                    Err(err) => {
                        let header = ResponseHeader::rejection(&err);
                        served = Served::Rejected(err);
                        HandlerState::Respond(header)
                    }
                },
                HandlerState::Dispatch(request) => {
                    LOGGER.debug(format!(
                        "{}: received request ({} bytes): {} {}",
                        peer,
                        received,
                        request.command(),
                        request.filename()
                    ));
                    let leftover = self.decoder.take_leftover();
                    let report = self.executor.execute(request, leftover, &mut self.conn).await;
                    served = Served::Executed(report);
                    HandlerState::Close
                }
                HandlerState::Respond(header) => {
                    if let Err(e) = self.conn.send_all(&header.serialize()).await {
                        LOGGER.debug(format!("{}: failed to send {}: {}", peer, header.status, e));
                    }
                    HandlerState::Close
                }
                HandlerState::Close => {
                    let _ = self.conn.shutdown().await;
                    break;
                }
            };
        }

        match &served {
            Served::Idle => LOGGER.debug(format!("{}: closed without a request", peer)),
            Served::Rejected(err) => LOGGER.warn(format!(
                "{}: {} ({})",
                peer,
                ResponseHeader::rejection(err).status_line(),
                err
            )),
            Served::Executed(report) if report.is_failure() => {
                LOGGER.error(format!("{}: {}", peer, report))
            }
            Served::Executed(report) => LOGGER.info(format!("{}: {}", peer, report)),
            Served::Aborted(reason) => LOGGER.error(format!("{}: aborted, {}", peer, reason)),
        }
        served
    }
}
