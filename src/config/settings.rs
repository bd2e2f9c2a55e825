use super::config::Config;
use super::opts::Opts;
use crate::constants::{DEFAULT_LISTEN_BACKLOG, DEFAULT_ROOT_DIR, IO_BUFFER_SIZE, MAX_HEADER_BYTES};
use crate::err::Result;
use crate::utilities::LogSink;
use crate::{ferry_error, ferry_error_with_source};
use ferry_wire::constants::MAX_FILENAME_BYTES;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Smallest header bound that still fits a maximal PUT header.
const MIN_HEADER_BYTES: usize = MAX_FILENAME_BYTES + 64;

/// Runtime settings: the config file merged under the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    pub root_dir: PathBuf,
    pub backlog: u32,
    /// `None` serves any number of connections at once.
    pub max_connections: Option<usize>,
    pub max_header_bytes: usize,
    pub io_buffer_size: usize,
    /// `Duration::ZERO` disables the timeout.
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub log_sink: LogSink,
    pub debug: bool,
}

impl Settings {
    pub fn resolve(opts: &Opts, config: &Config) -> Result<Self> {
        let port = opts
            .port
            .or(config.server.port)
            .ok_or_else(|| ferry_error!("no port given on the command line or in the config"))?;

        let ip = match opts.bind {
            Some(ip) => ip,
            None => config.server.bind.trim().parse::<IpAddr>().map_err(|e| {
                ferry_error_with_source!(e, "invalid bind address {:?}", config.server.bind)
            })?,
        };

        let root_dir = match &opts.root {
            Some(root) => root.clone(),
            None => PathBuf::from(&config.server.root_dir),
        };

        let max_connections = opts
            .max_connections
            .unwrap_or(config.server.max_connections);

        let log_sink = match (&opts.log_file, &config.logging.log_file) {
            (Some(path), _) => LogSink::File(path.clone()),
            (None, Some(path)) => LogSink::File(PathBuf::from(path)),
            (None, None) => LogSink::Stdout,
        };

        let settings = Self {
            bind_addr: SocketAddr::new(ip, port),
            root_dir,
            backlog: config.server.backlog,
            max_connections: (max_connections > 0).then_some(max_connections),
            max_header_bytes: config.limits.max_header_bytes,
            io_buffer_size: config.limits.io_buffer_size,
            read_timeout: Duration::from_secs(config.timeouts.read_secs),
            write_timeout: Duration::from_secs(config.timeouts.write_secs),
            log_sink,
            debug: opts.debug || config.logging.debug,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Loopback, ephemeral port, defaults everywhere else.
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
            root_dir: root.into(),
            backlog: DEFAULT_LISTEN_BACKLOG,
            max_connections: None,
            max_header_bytes: MAX_HEADER_BYTES,
            io_buffer_size: IO_BUFFER_SIZE,
            read_timeout: Duration::ZERO,
            write_timeout: Duration::ZERO,
            log_sink: LogSink::Stdout,
            debug: false,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.backlog == 0 {
            return Err(ferry_error!("listen backlog must be positive").into());
        }
        if self.io_buffer_size == 0 {
            return Err(ferry_error!("io_buffer_size must be positive").into());
        }
        if self.max_header_bytes < MIN_HEADER_BYTES {
            return Err(ferry_error!(
                "max_header_bytes must be at least {} bytes, got {}",
                MIN_HEADER_BYTES,
                self.max_header_bytes
            )
            .into());
        }
        if self.root_dir.as_os_str().is_empty() {
            return Err(ferry_error!("root directory must not be empty").into());
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::for_root(DEFAULT_ROOT_DIR)
    }
}
