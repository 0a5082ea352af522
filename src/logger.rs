//! `log` backend for the bridge.
//!
//! Lines look like `[1712345678901] WARN iohook_bridge::forwarder: ...`,
//! prefixed with milliseconds since the Unix epoch. DEBUG and INFO go to
//! stdout, WARN and ERROR to stderr, and everything is mirrored to the log
//! file while one is open.

use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct Logger {
    debug: AtomicBool,
    sink: Mutex<Option<File>>,
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

/// The process-wide logger, registered with `log` on first use.
///
/// If the host already installed a `log` backend, that backend keeps
/// receiving the records; the returned logger still tracks the debug flag
/// and log file.
pub fn init() -> &'static Logger {
    let mut fresh = false;
    let logger = LOGGER.get_or_init(|| {
        fresh = true;
        Logger::new()
    });
    if fresh && log::set_logger(logger).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }
    logger
}

pub fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// One formatted log line, newline included.
pub fn format_line(millis: u128, level: Level, target: &str, message: &str) -> String {
    format!("[{}] {} {}: {}\n", millis, level, target, message)
}

impl Logger {
    pub fn new() -> Self {
        Self {
            debug: AtomicBool::new(false),
            sink: Mutex::new(None),
        }
    }

    fn sink(&self) -> MutexGuard<'_, Option<File>> {
        self.sink.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_debug(&self, debug: bool) {
        self.debug.store(debug, Ordering::SeqCst);
        let level = if debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        };
        if log::max_level() != level {
            log::set_max_level(level);
        }
    }

    pub fn is_debug(&self) -> bool {
        self.debug.load(Ordering::SeqCst)
    }

    /// Open `path` for appending, unless a file is already open.
    pub fn open_sink(&self, path: &Path) -> io::Result<()> {
        let mut sink = self.sink();
        if sink.is_none() {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            *sink = Some(file);
        }
        Ok(())
    }

    pub fn close_sink(&self) {
        if let Some(mut file) = self.sink().take() {
            let _ = file.flush();
        }
    }

    pub fn has_sink(&self) -> bool {
        self.sink().is_some()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        let max = if self.is_debug() {
            Level::Debug
        } else {
            Level::Info
        };
        metadata.level() <= max
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = format_line(
            now_millis(),
            record.level(),
            record.target(),
            &record.args().to_string(),
        );

        match record.level() {
            Level::Error | Level::Warn => {
                let _ = io::stderr().write_all(line.as_bytes());
            }
            _ => {
                let _ = io::stdout().write_all(line.as_bytes());
            }
        }

        if let Some(file) = self.sink().as_mut() {
            let _ = file.write_all(line.as_bytes());
        }
    }

    fn flush(&self) {
        if let Some(file) = self.sink().as_mut() {
            let _ = file.flush();
        }
    }
}
