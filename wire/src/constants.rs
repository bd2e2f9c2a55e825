/// Upper bound on the bytes a request or response header may occupy.
pub const MAX_HEADER_BYTES: usize = 64 * 1024;

pub const MAX_FILENAME_BYTES: usize = 255;

/// Chunk size used when streaming bodies.
pub const IO_BUFFER_SIZE: usize = 4096;

pub const LINE_DELIMITER: u8 = b'\n';
