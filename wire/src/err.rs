use std::fmt::{Display, Formatter};

/// Framing failures detected while decoding a header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The request line lacks a command or filename, or a field does not parse.
    MalformedLine(String),
    UnknownCommand(String),
    InvalidFileName(String),
    /// A PUT header ended before its size line.
    MissingSize,
    InvalidSize(String),
    /// The header outgrew the decoder's buffer bound.
    TooLarge { limit: usize },
    MalformedResponse(String),
}

impl Display for ProtocolError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::MalformedLine(msg) => write!(f, "malformed request line: {}", msg),
            ProtocolError::UnknownCommand(cmd) => write!(f, "unknown command: {}", cmd),
            ProtocolError::InvalidFileName(name) => write!(f, "invalid filename: {:?}", name),
            ProtocolError::MissingSize => write!(f, "PUT request is missing its size line"),
            ProtocolError::InvalidSize(size) => write!(f, "invalid file size: {:?}", size),
            ProtocolError::TooLarge { limit } => {
                write!(f, "header exceeds the {} byte limit", limit)
            }
            ProtocolError::MalformedResponse(msg) => write!(f, "malformed response: {}", msg),
        }
    }
}

impl std::error::Error for ProtocolError {}

pub type Result<T> = std::result::Result<T, ProtocolError>;
