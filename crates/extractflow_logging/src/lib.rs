//! Logging setup shared by extractflow binaries.
//!
//! Two sinks: a size-rotated log file under the extractflow home and stderr.
//! Progress lines meant for humans are not logs and never go through here.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str =
    "extractflow=info,extractflow_schema=info,extractflow_sinks=info,extractflow_catalog=info";
const VERBOSE_LOG_FILTER: &str =
    "extractflow=debug,extractflow_schema=debug,extractflow_sinks=debug,extractflow_catalog=debug";
const MAX_LOG_FILES: usize = 5;
const MAX_LOG_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Logging configuration for one process.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    /// Debug-level console output.
    pub verbose: bool,
    /// Overrides `~/.extractflow/logs`.
    pub log_dir: Option<PathBuf>,
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the built-in filters when set.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let log_dir = config
        .log_dir
        .clone()
        .unwrap_or_else(extractflow_protocol::paths::default_logs_dir);
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create logs directory: {}", log_dir.display()))?;

    let file_writer = SharedRollingWriter::new(&log_dir, config.app_name)
        .context("Failed to initialize rolling log writer")?;

    let file_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(console_directives(config.verbose)));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(console_filter),
        )
        .try_init()
        .context("Global tracing subscriber already installed")?;

    Ok(())
}

/// Console directives without `RUST_LOG`: the file's info level, or debug.
fn console_directives(verbose: bool) -> &'static str {
    if verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    }
}

/// Append-only log file that rolls `<name>.log` to `<name>.log.1`, `.2`, ...
/// once it would exceed `max_size`.
struct RollingFile {
    dir: PathBuf,
    base_name: String,
    max_files: usize,
    max_size: u64,
    file: Option<File>,
    size: u64,
}

impl RollingFile {
    fn open(dir: &Path, base_name: &str, max_files: usize, max_size: u64) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let mut rolling = Self {
            dir: dir.to_path_buf(),
            base_name: sanitize_name(base_name),
            max_files: max_files.max(1),
            max_size,
            file: None,
            size: 0,
        };
        rolling.reopen()?;
        if rolling.size > rolling.max_size {
            rolling.roll()?;
        }
        Ok(rolling)
    }

    fn current_path(&self) -> PathBuf {
        self.dir.join(format!("{}.log", self.base_name))
    }

    fn rolled_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}.log.{}", self.base_name, index))
    }

    fn reopen(&mut self) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.current_path())?;
        self.size = file.metadata()?.len();
        self.file = Some(file);
        Ok(())
    }

    fn roll(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush();
        }

        let keep = self.max_files.saturating_sub(1);
        if keep > 0 {
            let oldest = self.rolled_path(keep);
            if oldest.exists() {
                fs::remove_file(&oldest)?;
            }
            for idx in (1..keep).rev() {
                let src = self.rolled_path(idx);
                if src.exists() {
                    fs::rename(&src, self.rolled_path(idx + 1))?;
                }
            }
            let current = self.current_path();
            if current.exists() {
                fs::rename(current, self.rolled_path(1))?;
            }
        } else {
            // Single-file mode: truncate in place.
            fs::write(self.current_path(), b"")?;
        }

        self.reopen()
    }
}

impl Write for RollingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.size + buf.len() as u64 > self.max_size {
            self.roll()?;
        }
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "log file unavailable"))?;
        let written = file.write(buf)?;
        self.size += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

#[derive(Clone)]
struct SharedRollingWriter {
    inner: Arc<Mutex<RollingFile>>,
}

impl SharedRollingWriter {
    fn new(dir: &Path, base_name: &str) -> Result<Self> {
        let file = RollingFile::open(dir, base_name, MAX_LOG_FILES, MAX_LOG_FILE_SIZE)
            .with_context(|| format!("Failed to open log file for {}", base_name))?;
        Ok(Self {
            inner: Arc::new(Mutex::new(file)),
        })
    }
}

struct SharedRollingWriterGuard {
    inner: Arc<Mutex<RollingFile>>,
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SharedRollingWriter {
    type Writer = SharedRollingWriterGuard;

    fn make_writer(&'a self) -> Self::Writer {
        SharedRollingWriterGuard {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl SharedRollingWriterGuard {
    fn with_file<T>(&self, f: impl FnOnce(&mut RollingFile) -> io::Result<T>) -> io::Result<T> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?;
        f(&mut guard)
    }
}

impl Write for SharedRollingWriterGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_file(|file| file.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_file(|file| file.flush())
    }
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}
