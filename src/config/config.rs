use crate::constants::{
    DEFAULT_BIND_ADDR, DEFAULT_LISTEN_BACKLOG, DEFAULT_ROOT_DIR, IO_BUFFER_SIZE, MAX_HEADER_BYTES,
};
use crate::err::Result;
use crate::ferry_error_with_source;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;

/// On-disk server configuration. Every section and key is optional.
///
/// ```toml
/// [server]
/// port = 8080
/// root_dir = "~/ferry/files"
/// max_connections = 64
///
/// [timeouts]
/// read_secs = 30
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerSection,
    pub limits: LimitsSection,
    pub timeouts: TimeoutsSection,
    pub logging: LoggingSection,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
    pub port: Option<u16>,
    pub root_dir: String,
    pub backlog: u32,
    /// 0 leaves the number of concurrent connections unbounded.
    pub max_connections: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND_ADDR.to_string(),
            port: None,
            root_dir: DEFAULT_ROOT_DIR.to_string(),
            backlog: DEFAULT_LISTEN_BACKLOG,
            max_connections: 0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LimitsSection {
    pub max_header_bytes: usize,
    pub io_buffer_size: usize,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            max_header_bytes: MAX_HEADER_BYTES,
            io_buffer_size: IO_BUFFER_SIZE,
        }
    }
}

/// Socket timeouts in seconds; 0 waits forever.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct TimeoutsSection {
    pub read_secs: u64,
    pub write_secs: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct LoggingSection {
    pub log_file: Option<String>,
    pub debug: bool,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path).map_err(|e| {
            ferry_error_with_source!(e, "cannot read config file {}", config_path.display())
        })?;
        Self::from_toml(&content)
            .map_err(|e| ferry_error_with_source!(e, "invalid config file {}", config_path.display()).into())
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn dump(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let f = fs::File::create(config_path)?;
        let mut f_writer = std::io::BufWriter::new(f);
        f_writer.write_all(toml::to_string(&self)?.as_bytes())?;
        f_writer.flush()?;
        Ok(())
    }
}
