//! Wire format shared by the ferry server and client.
//!
//! Headers are newline-delimited text lines; bodies are raw bytes framed by
//! a declared size. Nothing in this crate performs I/O: callers feed the
//! bytes they read into a decoder and stream bodies themselves.

pub mod constants;
pub mod err;
pub mod protocol;

pub use err::{ProtocolError, Result};
pub use protocol::{
    BodyCursor, Command, FileMeta, FileName, Protocol, Request, RequestDecoder, ResponseDecoder,
    ResponseHeader, StatusCode, messages, unix_seconds,
};
