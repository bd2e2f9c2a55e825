//! Asynchronous operator log.
//!
//! An [`AsyncLogger`] handle pushes records into a bounded channel; a
//! background task drains it into a log file or stdout, so request handlers
//! never block on console or disk output.
//!
//! ```no_run
//! use ferry::utilities::logger::{LogSink, init_logger};
//!
//! # async fn run() -> ferry::err::Result<()> {
//! let (logger, task) = init_logger(LogSink::Stdout).await?;
//! logger.info("Listening on 0.0.0.0:8080");
//! logger.shutdown().await;
//! let _ = task.await;
//! # Ok(())
//! # }
//! ```

use crate::err::Result;
use crate::global_var::{LOGGER_CELL, debug_mode};
use chrono::{DateTime, Utc};
use std::fmt;
use std::ops::Deref;
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const CHANNEL_BOUND: usize = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Where log lines end up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogSink {
    Stdout,
    /// Appended to; created if missing.
    File(PathBuf),
}

/// Cloneable logging handle. A handle without a channel discards everything.
#[derive(Clone, Debug)]
pub struct AsyncLogger {
    tx: Option<mpsc::Sender<LogRecord>>,
    echo_stdout: bool,
}

impl AsyncLogger {
    pub fn disabled() -> Self {
        Self {
            tx: None,
            echo_stdout: false,
        }
    }

    fn log<S: Into<String>>(&self, level: LogLevel, msg: S) {
        let Some(tx) = &self.tx else {
            return;
        };
        let msg = msg.into();
        if self.echo_stdout && debug_mode() {
            println!("{}: {}", level, &msg);
        }
        if let Err(err) = tx.try_send(LogRecord::new(level, msg)) {
            eprintln!("Failed to send log message: {}", err);
        }
    }

    /// Ask the writer task to flush and exit.
    pub async fn shutdown(&self) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(LogRecord::Shutdown).await;
        }
    }

    pub fn trace<S: Into<String>>(&self, msg: S) {
        if debug_mode() {
            self.log(LogLevel::Trace, msg);
        }
    }
    pub fn debug<S: Into<String>>(&self, msg: S) {
        if debug_mode() {
            self.log(LogLevel::Debug, msg);
        }
    }
    pub fn info<S: Into<String>>(&self, msg: S) {
        self.log(LogLevel::Info, msg);
    }
    pub fn warn<S: Into<String>>(&self, msg: S) {
        self.log(LogLevel::Warn, msg);
    }
    pub fn error<S: Into<String>>(&self, msg: S) {
        self.log(LogLevel::Error, msg);
    }
}

#[derive(Debug)]
enum LogRecord {
    Message {
        level: LogLevel,
        msg: String,
        ts: DateTime<Utc>,
    },
    Shutdown,
}

impl LogRecord {
    fn new(level: LogLevel, msg: String) -> Self {
        Self::Message {
            level,
            msg,
            ts: Utc::now(),
        }
    }

    /// `2025-10-08T21:22:33.123Z [LEVEL] message\n`
    fn format_line(&self) -> Option<String> {
        match self {
            LogRecord::Message { level, msg, ts } => Some(format!(
                "{}Z [{}] {}\n",
                ts.format("%Y-%m-%dT%H:%M:%S%.3f"),
                level,
                msg
            )),
            LogRecord::Shutdown => None,
        }
    }
}

async fn open_sink(sink: &LogSink) -> Result<Box<dyn AsyncWrite + Unpin + Send>> {
    match sink {
        LogSink::Stdout => Ok(Box::new(tokio::io::stdout())),
        LogSink::File(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
            let file = OpenOptions::new().create(true).append(true).open(path).await?;
            Ok(Box::new(file))
        }
    }
}

/// Start the writer task for `sink`. Returns the handle and the task; the
/// task ends after [`AsyncLogger::shutdown`] or once every handle is dropped.
pub async fn init_logger(sink: LogSink) -> Result<(AsyncLogger, JoinHandle<()>)> {
    let mut writer = BufWriter::new(open_sink(&sink).await?);
    let (tx, mut rx) = mpsc::channel::<LogRecord>(CHANNEL_BOUND);

    let echo_stdout = matches!(sink, LogSink::File(_));
    let task = tokio::spawn(async move {
        while let Some(rec) = rx.recv().await {
            let Some(line) = rec.format_line() else {
                break;
            };
            if writer.write_all(line.as_bytes()).await.is_err() {
                // The file may have been rotated away; reopen once and retry.
                let _ = writer.flush().await;
                match open_sink(&sink).await {
                    Ok(fresh) => {
                        writer = BufWriter::new(fresh);
                        let _ = writer.write_all(line.as_bytes()).await;
                    }
                    Err(_) => {
                        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                    }
                }
            }
            if rx.is_empty() {
                let _ = writer.flush().await;
            }
        }
        let _ = writer.flush().await;
    });

    Ok((
        AsyncLogger {
            tx: Some(tx),
            echo_stdout,
        },
        task,
    ))
}

/// Install `logger` as the process-wide [`LOGGER`](crate::global_var::LOGGER).
/// Returns false if one was installed already.
pub fn install(logger: AsyncLogger) -> bool {
    LOGGER_CELL.set(logger).is_ok()
}

/// Resolves to the installed logger; messages sent before installation are discarded.
pub(crate) struct Logger;

impl Deref for Logger {
    type Target = AsyncLogger;
    fn deref(&self) -> &Self::Target {
        LOGGER_CELL.get_or_init(AsyncLogger::disabled)
    }
}
