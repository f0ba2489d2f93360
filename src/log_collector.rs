//! Decoupled logging pipeline for kernel builds.
//!
//! Every `log::*` record of a build run is mirrored to stderr (so the operator
//! sees it live, interleaved with the inherited output of tar/patch/make) and
//! persisted to a dedicated run log on disk.
//!
//! # Architecture
//!
//! ```text
//! log::info!() / log::error!() ...
//!     |
//! [LogCollector] (implements log::Log, never blocks the pipeline)
//!     | (crossbeam unbounded channel)
//!     v
//! [persister thread]
//!     |-- stderr
//!     `-- logs/build-<timestamp>.log
//! ```
//!
//! `wait_for_empty()` sends a flush marker down the same channel and blocks
//! until the persister has written everything queued before it.

use chrono::Local;
use crossbeam_channel::{unbounded, Sender};
use log::{LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Internal log line or special marker
enum LogMessage {
    /// Regular log line
    Line(LogLine),
    /// Flush marker with channel sender to signal completion
    Flush(std::sync::mpsc::Sender<()>),
}

/// Get the logs path for a build invoked from `work_dir`: <work_dir>/logs
pub fn logs_path_for(work_dir: &Path) -> PathBuf {
    work_dir.join("logs")
}

/// Ensure the logs directory exists
pub fn ensure_logs_dir_exists(log_dir: &Path) -> Result<(), String> {
    std::fs::create_dir_all(log_dir)
        .map_err(|e| format!("Failed to create logs directory: {}", e))?;
    Ok(())
}

/// A log line with metadata
#[derive(Clone, Debug)]
pub struct LogLine {
    /// The actual log message
    pub message: String,
    /// Level name as printed (INFO, WARN, ...)
    pub level: String,
    /// Timestamp of when the log was created
    pub timestamp: String,
}

impl LogLine {
    pub fn new(level: log::Level, message: String) -> Self {
        LogLine {
            message,
            level: level.to_string(),
            timestamp: Local::now().format("%H:%M:%S%.3f").to_string(),
        }
    }

    fn render(&self) -> String {
        format!("[{}] [{}] {}", self.timestamp, self.level, self.message)
    }
}

/// Unified logger that persists every record of a build run
pub struct LogCollector {
    /// Channel sender for log lines (internal) - crossbeam unbounded for reliability
    tx: Sender<LogMessage>,
    /// Path of this run's log file
    session_log: PathBuf,
    /// Maximum level forwarded to the persister
    max_level: LevelFilter,
}

impl LogCollector {
    /// Create a new LogCollector writing to a fresh `build-<timestamp>.log`
    /// inside `log_dir`, and spawn its persister thread.
    pub fn new(log_dir: PathBuf, max_level: LevelFilter, echo_stderr: bool) -> Result<Self, String> {
        ensure_logs_dir_exists(&log_dir)?;

        let session_log = create_session_log(&log_dir)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&session_log)
            .map_err(|e| format!("Failed to open log file {}: {}", session_log.display(), e))?;

        let (tx, rx) = unbounded::<LogMessage>();

        // Plain OS thread: the pipeline is synchronous and the persister must
        // keep draining while make/patch hold the foreground.
        std::thread::spawn(move || {
            while let Ok(msg) = rx.recv() {
                match msg {
                    LogMessage::Line(line) => {
                        let rendered = line.render();
                        if echo_stderr {
                            eprintln!("{}", rendered);
                        }
                        if let Err(e) = writeln!(file, "{}", rendered) {
                            eprintln!("[Log] Failed to write to log file: {}", e);
                        }
                    }
                    LogMessage::Flush(done) => {
                        let _ = file.flush();
                        let _ = file.sync_data();
                        let _ = done.send(());
                    }
                }
            }
        });

        Ok(LogCollector {
            tx,
            session_log,
            max_level,
        })
    }

    /// Path of the log file this collector writes to
    pub fn session_log_path(&self) -> &Path {
        &self.session_log
    }

    /// Send a log line (non-blocking)
    pub fn log_line(&self, line: LogLine) {
        let _ = self.tx.send(LogMessage::Line(line));
    }

    /// Wait for all pending logs to be written to disk
    ///
    /// Guarantees that all lines sent before this call have been written
    /// before returning.
    pub fn wait_for_empty(&self) -> Result<(), String> {
        let (tx, rx) = std::sync::mpsc::channel::<()>();
        self.tx
            .send(LogMessage::Flush(tx))
            .map_err(|e| format!("Failed to send flush marker: {}", e))?;
        rx.recv()
            .map_err(|e| format!("Flush signal interrupted: {}", e))?;
        Ok(())
    }

    /// Register a clone of this collector as the global `log` backend.
    pub fn install(&self) -> Result<(), log::SetLoggerError> {
        log::set_boxed_logger(Box::new(self.clone()))
            .map(|()| log::set_max_level(self.max_level))
    }
}

impl Clone for LogCollector {
    fn clone(&self) -> Self {
        LogCollector {
            tx: self.tx.clone(),
            session_log: self.session_log.clone(),
            max_level: self.max_level,
        }
    }
}

/// Wires all log::info!(), log::warn!(), log::error!() calls into LogCollector
impl Log for LogCollector {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.log_line(LogLine::new(record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {
        let _ = self.wait_for_empty();
    }
}

/// Create a new, empty run log named after the current local time.
fn create_session_log(log_dir: &Path) -> Result<PathBuf, String> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S%.3f");
    let log_path = log_dir.join(format!("build-{}.log", timestamp));
    File::create(&log_path).map_err(|e| format!("Failed to create log file: {}", e))?;
    Ok(log_path)
}
