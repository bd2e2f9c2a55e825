use crate::constants::MAX_HEADER_BYTES;
use crate::err::{ProtocolError, Result};
use crate::protocol::codec::Protocol;
use crate::protocol::command::Command;
use crate::protocol::line_buffer::LineBuffer;
use crate::protocol::number::{parse_decimal, push_decimal};
use bytes::Bytes;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

/// Canonical status-line messages.
pub mod messages {
    pub const OK: &str = "OK";
    pub const NOT_MODIFIED: &str = "Not Modified";
    pub const UPLOADED: &str = "File uploaded successfully";
    pub const DELETED: &str = "File deleted successfully";
    pub const NOT_FOUND: &str = "File not found";
    pub const BAD_REQUEST: &str = "Bad request";
    pub const MISSING_SIZE: &str = "Bad request - missing file size";
    pub const INVALID_SIZE: &str = "Bad request - invalid file size";
    pub const INVALID_FILENAME: &str = "Bad request - invalid filename";
    pub const UNKNOWN_COMMAND: &str = "Unknown command";
    pub const TOO_LARGE: &str = "Request too large";
    pub const OPEN_FAILED: &str = "Error opening file";
    pub const CREATE_FAILED: &str = "Error creating file";
    pub const WRITE_FAILED: &str = "Error writing file";
    pub const INCOMPLETE: &str = "Incomplete file transfer";
    pub const DELETE_FAILED: &str = "Error deleting file";
    pub const STAT_FAILED: &str = "Error reading file metadata";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok,
    NotModified,
    BadRequest,
    NotFound,
    InternalError,
}

impl StatusCode {
    pub fn as_u16(self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::NotModified => 304,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::InternalError => 500,
        }
    }

    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            200 => Some(StatusCode::Ok),
            304 => Some(StatusCode::NotModified),
            400 => Some(StatusCode::BadRequest),
            404 => Some(StatusCode::NotFound),
            500 => Some(StatusCode::InternalError),
            _ => None,
        }
    }
}

impl Display for StatusCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

/// Size and modification time (seconds since the Unix epoch) of a stored file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMeta {
    pub size: u64,
    pub mtime: i64,
}

impl FileMeta {
    /// Size and whole-second modification time of a file on disk.
    pub fn from_metadata(md: &std::fs::Metadata) -> std::io::Result<Self> {
        Ok(Self {
            size: md.len(),
            mtime: unix_seconds(md.modified()?),
        })
    }
}

/// Seconds since the epoch; instants before it come out negative.
pub fn unix_seconds(t: SystemTime) -> i64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}

/// Everything in a response before its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeader {
    pub status: StatusCode,
    pub message: String,
    /// Present only on a 200 answer to GET; a body of `size` bytes follows.
    pub meta: Option<FileMeta>,
}

impl ResponseHeader {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            meta: None,
        }
    }

    pub fn file(meta: FileMeta) -> Self {
        Self {
            status: StatusCode::Ok,
            message: messages::OK.to_string(),
            meta: Some(meta),
        }
    }

    /// The answer a server gives to a request it could not decode.
    pub fn rejection(err: &ProtocolError) -> Self {
        let message = match err {
            ProtocolError::UnknownCommand(_) => messages::UNKNOWN_COMMAND,
            ProtocolError::InvalidFileName(_) => messages::INVALID_FILENAME,
            ProtocolError::MissingSize => messages::MISSING_SIZE,
            ProtocolError::InvalidSize(_) => messages::INVALID_SIZE,
            ProtocolError::TooLarge { .. } => messages::TOO_LARGE,
            ProtocolError::MalformedLine(_) | ProtocolError::MalformedResponse(_) => {
                messages::BAD_REQUEST
            }
        };
        Self::new(StatusCode::BadRequest, message)
    }

    /// `<code> <message>`, as printed by the client.
    pub fn status_line(&self) -> String {
        format!("{} {}", self.status, self.message)
    }
}

impl Protocol for ResponseHeader {
    /// The command being answered; only a GET 200 carries size and mtime lines.
    type Context = Command;

    fn deserialize(bytes: &[u8], answering: Command) -> Result<Self> {
        let mut decoder = ResponseDecoder::new(answering);
        decoder.feed(bytes);
        match decoder.decode()? {
            Some(header) => Ok(header),
            None => Err(decoder.finish()),
        }
    }

    fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.message.len() + 32);
        push_decimal(&mut out, self.status.as_u16());
        out.push(b' ');
        out.extend_from_slice(self.message.as_bytes());
        out.push(b'\n');
        if let Some(meta) = &self.meta {
            push_decimal(&mut out, meta.size);
            out.push(b'\n');
            push_decimal(&mut out, meta.mtime);
            out.push(b'\n');
        }
        out
    }
}

#[derive(Debug)]
enum ResponseState {
    AwaitingStatus,
    AwaitingSize {
        status: StatusCode,
        message: String,
    },
    AwaitingMtime {
        status: StatusCode,
        message: String,
        size: u64,
    },
    Complete,
}

/// Incremental response header decoder.
///
/// Whether size and mtime lines follow the status line depends on the
/// request being answered, so the decoder is built for one command.
#[derive(Debug)]
pub struct ResponseDecoder {
    lines: LineBuffer,
    answering: Command,
    state: ResponseState,
}

impl ResponseDecoder {
    pub fn new(answering: Command) -> Self {
        Self::with_limit(answering, MAX_HEADER_BYTES)
    }

    pub fn with_limit(answering: Command, max_header_bytes: usize) -> Self {
        Self {
            lines: LineBuffer::new(max_header_bytes),
            answering,
            state: ResponseState::AwaitingStatus,
        }
    }

    pub fn feed(&mut self, chunk: &[u8]) {
        self.lines.extend(chunk);
    }

    pub fn decode(&mut self) -> Result<Option<ResponseHeader>> {
        loop {
            match std::mem::replace(&mut self.state, ResponseState::Complete) {
                ResponseState::AwaitingStatus => {
                    let Some(line) = self.lines.next_line()? else {
                        self.state = ResponseState::AwaitingStatus;
                        return Ok(None);
                    };
                    let (status, message) = parse_status_line(&line)?;
                    if status == StatusCode::Ok && self.answering == Command::Get {
                        self.state = ResponseState::AwaitingSize { status, message };
                    } else {
                        return Ok(Some(ResponseHeader::new(status, message)));
                    }
                }
                ResponseState::AwaitingSize { status, message } => {
                    let Some(line) = self.lines.next_line()? else {
                        self.state = ResponseState::AwaitingSize { status, message };
                        return Ok(None);
                    };
                    let size = parse_decimal::<u64>(&line)
                        .ok_or_else(|| malformed("size line", &line))?;
                    self.state = ResponseState::AwaitingMtime {
                        status,
                        message,
                        size,
                    };
                }
                ResponseState::AwaitingMtime {
                    status,
                    message,
                    size,
                } => {
                    let Some(line) = self.lines.next_line()? else {
                        self.state = ResponseState::AwaitingMtime {
                            status,
                            message,
                            size,
                        };
                        return Ok(None);
                    };
                    let mtime = parse_decimal::<i64>(&line)
                        .ok_or_else(|| malformed("mtime line", &line))?;
                    return Ok(Some(ResponseHeader {
                        status,
                        message,
                        meta: Some(FileMeta { size, mtime }),
                    }));
                }
                ResponseState::Complete => return Ok(None),
            }
        }
    }

    pub fn finish(&self) -> ProtocolError {
        let what = match self.state {
            ResponseState::AwaitingStatus => "status line",
            ResponseState::AwaitingSize { .. } => "size line",
            ResponseState::AwaitingMtime { .. } => "mtime line",
            ResponseState::Complete => "more data",
        };
        ProtocolError::MalformedResponse(format!("connection closed while awaiting {}", what))
    }

    /// Body bytes that arrived in the same reads as the header.
    pub fn take_leftover(&mut self) -> Bytes {
        self.lines.take_remaining()
    }
}

fn malformed(what: &str, line: &[u8]) -> ProtocolError {
    ProtocolError::MalformedResponse(format!(
        "invalid {}: {:?}",
        what,
        String::from_utf8_lossy(line)
    ))
}

fn parse_status_line(line: &[u8]) -> Result<(StatusCode, String)> {
    let line = std::str::from_utf8(line).map_err(|_| malformed("status line", line))?;
    let (code, message) = line.split_once(' ').unwrap_or((line, ""));
    let status = parse_decimal::<u16>(code.as_bytes())
        .and_then(StatusCode::from_u16)
        .ok_or_else(|| malformed("status line", line.as_bytes()))?;
    Ok((status, message.trim().to_string()))
}
