use crate::constants::MAX_HEADER_BYTES;
use crate::err::{ProtocolError, Result};
use crate::protocol::codec::Protocol;
use crate::protocol::command::Command;
use crate::protocol::filename::FileName;
use crate::protocol::line_buffer::LineBuffer;
use crate::protocol::number::{parse_decimal, push_decimal};
use bytes::Bytes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `client_mtime` is 0 when the client holds no cached copy.
    Get { filename: FileName, client_mtime: i64 },
    Put { filename: FileName, size: u64 },
    Delete { filename: FileName },
}

impl Request {
    pub fn command(&self) -> Command {
        match self {
            Request::Get { .. } => Command::Get,
            Request::Put { .. } => Command::Put,
            Request::Delete { .. } => Command::Delete,
        }
    }

    pub fn filename(&self) -> &FileName {
        match self {
            Request::Get { filename, .. }
            | Request::Put { filename, .. }
            | Request::Delete { filename } => filename,
        }
    }
}

impl Protocol for Request {
    type Context = ();

    /// Decode a request from a buffer holding at least its whole header.
    fn deserialize(bytes: &[u8], _: ()) -> Result<Self> {
        let mut decoder = RequestDecoder::default();
        decoder.feed(bytes);
        match decoder.decode()? {
            Some(request) => Ok(request),
            None => Err(decoder.finish()),
        }
    }

    fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(self.command().as_str().as_bytes());
        out.push(b' ');
        out.extend_from_slice(self.filename().as_str().as_bytes());
        match self {
            Request::Get { client_mtime, .. } => {
                out.push(b' ');
                push_decimal(&mut out, *client_mtime);
            }
            Request::Put { size, .. } => {
                out.push(b'\n');
                push_decimal(&mut out, *size);
            }
            Request::Delete { .. } => {}
        }
        out.push(b'\n');
        out
    }
}

#[derive(Debug)]
enum RequestState {
    AwaitingLine,
    AwaitingLength { filename: FileName },
    Complete,
}

enum RequestLine {
    Ready(Request),
    NeedsSize(FileName),
}

/// Incremental request header decoder.
///
/// Feed it whatever the transport returns; `decode` yields the request once
/// every header line is present. Bytes that arrived behind the header are
/// kept for [`RequestDecoder::take_leftover`].
#[derive(Debug)]
pub struct RequestDecoder {
    lines: LineBuffer,
    state: RequestState,
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self::new(MAX_HEADER_BYTES)
    }
}

impl RequestDecoder {
    pub fn new(max_header_bytes: usize) -> Self {
        Self {
            lines: LineBuffer::new(max_header_bytes),
            state: RequestState::AwaitingLine,
        }
    }

    pub fn feed(&mut self, chunk: &[u8]) {
        self.lines.extend(chunk);
    }

    pub fn decode(&mut self) -> Result<Option<Request>> {
        loop {
            match std::mem::replace(&mut self.state, RequestState::Complete) {
                RequestState::AwaitingLine => {
                    let Some(line) = self.lines.next_line()? else {
                        self.state = RequestState::AwaitingLine;
                        return Ok(None);
                    };
                    match parse_request_line(&line)? {
                        RequestLine::Ready(request) => return Ok(Some(request)),
                        RequestLine::NeedsSize(filename) => {
                            self.state = RequestState::AwaitingLength { filename };
                        }
                    }
                }
                RequestState::AwaitingLength { filename } => {
                    let Some(line) = self.lines.next_line()? else {
                        self.state = RequestState::AwaitingLength { filename };
                        return Ok(None);
                    };
                    let size = parse_decimal::<u64>(&line).ok_or_else(|| {
                        ProtocolError::InvalidSize(String::from_utf8_lossy(&line).into_owned())
                    })?;
                    return Ok(Some(Request::Put { filename, size }));
                }
                // One request per connection; anything after it is body or junk.
                RequestState::Complete => return Ok(None),
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.state, RequestState::Complete)
    }

    /// The error that end-of-stream amounts to in the current state.
    pub fn finish(&self) -> ProtocolError {
        match self.state {
            RequestState::AwaitingLength { .. } => ProtocolError::MissingSize,
            _ => ProtocolError::MalformedLine("connection closed before end of request line".into()),
        }
    }

    /// Bytes received behind the header: the first bytes of a PUT body.
    pub fn take_leftover(&mut self) -> Bytes {
        self.lines.take_remaining()
    }
}

fn parse_request_line(line: &[u8]) -> Result<RequestLine> {
    let line = std::str::from_utf8(line)
        .map_err(|_| ProtocolError::MalformedLine("request line is not valid UTF-8".into()))?;
    let mut fields = line.split_ascii_whitespace();
    let (Some(command), Some(name)) = (fields.next(), fields.next()) else {
        return Err(ProtocolError::MalformedLine(
            "expected a command and a filename".into(),
        ));
    };
    let command: Command = command.parse()?;
    let filename = FileName::new(name)?;

    match command {
        Command::Get => {
            let client_mtime = match fields.next() {
                Some(ts) => parse_decimal::<i64>(ts.as_bytes()).ok_or_else(|| {
                    ProtocolError::MalformedLine(format!("invalid timestamp {:?}", ts))
                })?,
                None => 0,
            };
            Ok(RequestLine::Ready(Request::Get {
                filename,
                client_mtime,
            }))
        }
        Command::Put => Ok(RequestLine::NeedsSize(filename)),
        Command::Delete => Ok(RequestLine::Ready(Request::Delete { filename })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> FileName {
        FileName::new(s).unwrap()
    }

    fn decode_all(bytes: &[u8]) -> (Request, Bytes) {
        let mut decoder = RequestDecoder::default();
        decoder.feed(bytes);
        let request = decoder.decode().unwrap().expect("complete request");
        (request, decoder.take_leftover())
    }

    #[test]
    fn serializes_each_command() {
        let get = Request::Get {
            filename: name("a.txt"),
            client_mtime: 0,
        };
        assert_eq!(get.serialize(), b"GET a.txt 0\n");

        let put = Request::Put {
            filename: name("a.txt"),
            size: 5,
        };
        assert_eq!(put.serialize(), b"PUT a.txt\n5\n");

        let delete = Request::Delete {
            filename: name("a.txt"),
        };
        assert_eq!(delete.serialize(), b"DELETE a.txt\n");
    }

    #[test]
    fn decodes_get_with_and_without_timestamp() {
        let (req, _) = decode_all(b"GET a.txt 1700000000\n");
        assert_eq!(
            req,
            Request::Get {
                filename: name("a.txt"),
                client_mtime: 1_700_000_000
            }
        );

        let (req, _) = decode_all(b"GET a.txt\n");
        assert_eq!(
            req,
            Request::Get {
                filename: name("a.txt"),
                client_mtime: 0
            }
        );
    }

    #[test]
    fn put_header_with_bundled_payload_keeps_every_body_byte() {
        let (req, leftover) = decode_all(b"PUT a.txt\n5\nhello");
        assert_eq!(
            req,
            Request::Put {
                filename: name("a.txt"),
                size: 5
            }
        );
        assert_eq!(&leftover[..], b"hello");
    }

    #[test]
    fn leftover_is_exact_for_every_split_point() {
        let wire = b"PUT blob.bin\n10\n0123456789";
        let header_len = b"PUT blob.bin\n10\n".len();
        for split in 0..=wire.len() {
            let mut decoder = RequestDecoder::default();
            decoder.feed(&wire[..split]);
            let first = decoder.decode().unwrap();
            if split < header_len {
                assert!(first.is_none(), "split {split} decoded too early");
                decoder.feed(&wire[split..]);
                let req = decoder.decode().unwrap().expect("complete after second feed");
                assert_eq!(req.filename().as_str(), "blob.bin");
                assert_eq!(&decoder.take_leftover()[..], &wire[header_len..]);
            } else {
                assert!(first.is_some(), "split {split} should be complete");
                let mut body = decoder.take_leftover().to_vec();
                body.extend_from_slice(&wire[split..]);
                assert_eq!(&body[..], b"0123456789", "split {split}");
            }
        }
    }

    #[test]
    fn byte_at_a_time_delete() {
        let mut decoder = RequestDecoder::default();
        let wire = b"DELETE old.log\n";
        for (i, b) in wire.iter().enumerate() {
            decoder.feed(std::slice::from_ref(b));
            let out = decoder.decode().unwrap();
            assert_eq!(out.is_some(), i == wire.len() - 1);
        }
        assert!(decoder.is_complete());
    }

    #[test]
    fn missing_filename_is_malformed() {
        assert!(matches!(
            Request::deserialize(b"GET\n", ()),
            Err(ProtocolError::MalformedLine(_))
        ));
        assert!(matches!(
            Request::deserialize(b"\n", ()),
            Err(ProtocolError::MalformedLine(_))
        ));
    }

    #[test]
    fn unknown_command_is_reported() {
        assert_eq!(
            Request::deserialize(b"LIST a.txt\n", ()),
            Err(ProtocolError::UnknownCommand("LIST".into()))
        );
    }

    #[test]
    fn bad_timestamp_and_bad_filename() {
        assert!(matches!(
            Request::deserialize(b"GET a.txt yesterday\n", ()),
            Err(ProtocolError::MalformedLine(_))
        ));
        assert!(matches!(
            Request::deserialize(b"DELETE ../etc/passwd\n", ()),
            Err(ProtocolError::InvalidFileName(_))
        ));
    }

    #[test]
    fn put_size_line_problems() {
        let mut decoder = RequestDecoder::default();
        decoder.feed(b"PUT a.txt\n");
        assert_eq!(decoder.decode().unwrap(), None);
        assert_eq!(decoder.finish(), ProtocolError::MissingSize);

        assert!(matches!(
            Request::deserialize(b"PUT a.txt\nfive\n", ()),
            Err(ProtocolError::InvalidSize(_))
        ));
    }

    #[test]
    fn unterminated_line_at_eof_is_malformed() {
        let mut decoder = RequestDecoder::default();
        decoder.feed(b"GET a.txt 0");
        assert_eq!(decoder.decode().unwrap(), None);
        assert!(matches!(decoder.finish(), ProtocolError::MalformedLine(_)));
    }

    #[test]
    fn oversized_header_is_rejected() {
        let mut decoder = RequestDecoder::new(32);
        decoder.feed(&[b'A'; 33]);
        assert_eq!(
            decoder.decode(),
            Err(ProtocolError::TooLarge { limit: 32 })
        );
    }

    #[test]
    fn extra_fields_are_ignored() {
        let (req, _) = decode_all(b"DELETE a.txt 99 trailing\n");
        assert_eq!(
            req,
            Request::Delete {
                filename: name("a.txt")
            }
        );
    }
}
