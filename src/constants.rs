/// Storage root used when neither the CLI nor the config file names one.
pub const DEFAULT_ROOT_DIR: &str = "./server_files";

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";

pub const DEFAULT_LISTEN_BACKLOG: u32 = 1000;

pub use ferry_wire::constants::{IO_BUFFER_SIZE, MAX_HEADER_BYTES};
