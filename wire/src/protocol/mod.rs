mod body;
mod codec;
mod command;
mod filename;
mod line_buffer;
mod number;
mod request;
mod response;

pub use body::BodyCursor;
pub use codec::Protocol;
pub use command::Command;
pub use filename::FileName;
pub use line_buffer::LineBuffer;
pub use request::{Request, RequestDecoder};
pub use response::{FileMeta, ResponseDecoder, ResponseHeader, StatusCode, messages, unix_seconds};
