pub mod logger;
pub mod temp_dir;

pub use logger::{AsyncLogger, LogSink, init_logger};
