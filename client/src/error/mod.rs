use std::fmt::{Debug, Display};

/// Every way a client invocation can fail. The first field is the message
/// shown to the user, the second a trace for `{:?}`.
pub enum ClientError {
    ConnectionError(String, String),
    TransferError(String, String),
    ResponseParseError(String, String),
    LocalFileError(String, String),
}

impl Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::ConnectionError(msg, _) => write!(f, "Connection error: {}", msg),
            ClientError::TransferError(msg, _) => write!(f, "Transfer error: {}", msg),
            ClientError::ResponseParseError(msg, _) => write!(f, "Invalid response: {}", msg),
            ClientError::LocalFileError(msg, _) => write!(f, "Local file error: {}", msg),
        }
    }
}

impl Debug for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::ConnectionError(msg, trace) => {
                write!(f, "Connection error: {}\nTrace: {}", msg, trace)
            }
            ClientError::TransferError(msg, trace) => {
                write!(f, "Transfer error: {}\nTrace: {}", msg, trace)
            }
            ClientError::ResponseParseError(msg, trace) => {
                write!(f, "Invalid response: {}\nTrace: {}", msg, trace)
            }
            ClientError::LocalFileError(msg, trace) => {
                write!(f, "Local file error: {}\nTrace: {}", msg, trace)
            }
        }
    }
}

impl std::error::Error for ClientError {}
