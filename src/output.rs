//! Run output: status lines on the console, mirrored into an optional log file
//!
//! A single [`RunLog`] is created at startup and handed by reference to everything
//! that reports progress. Log file problems never stop a run; they only turn file
//! logging off or drop a line.

use anyhow::{Context, Result};
use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

#[cfg(windows)]
const NEWLINE: &str = "\r\n";
#[cfg(not(windows))]
const NEWLINE: &str = "\n";

/// Console output with an optional append-only log file
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    log_path: Option<PathBuf>,
}

impl RunLog {
    /// Console-only output
    pub fn console() -> Self {
        Self::default()
    }

    /// Create (or truncate) the log file and mirror output into it
    ///
    /// The file starts with a line recording when the run began.
    pub fn create(path: &Path) -> Result<Self> {
        let mut file = File::create(path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        write!(
            file,
            "# Outlook Profiler run started {}{}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            NEWLINE
        )
        .with_context(|| format!("Failed to write log file {}", path.display()))?;

        Ok(Self {
            log_path: Some(path.to_path_buf()),
        })
    }

    /// Log to `path` when given and creatable, otherwise fall back to the console
    pub fn open_or_console(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::console();
        };

        match Self::create(path) {
            Ok(log) => log,
            Err(e) => {
                println!("Log file cannot be created - logging will not be performed!");
                println!("Exception details: {:?}", e);
                Self::console()
            }
        }
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    pub fn is_logging(&self) -> bool {
        self.log_path.is_some()
    }

    /// Print a status line and append it to the log file
    pub fn line(&self, text: impl AsRef<str>) {
        let text = text.as_ref();
        println!("{}", text);
        self.append(text);
    }

    /// Print an empty line and append it to the log file
    pub fn blank(&self) {
        self.line("");
    }

    /// Print to the console only
    pub fn console_line(&self, text: impl AsRef<str>) {
        println!("{}", text.as_ref());
    }

    fn append(&self, text: &str) {
        let Some(path) = &self.log_path else {
            return;
        };

        let result = OpenOptions::new()
            .append(true)
            .open(path)
            .and_then(|mut file| write!(file, "{}{}", text, NEWLINE));

        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "failed to append to log file");
        }
    }
}
