//! Logging setup and runtime level control
//!
//! Output goes to stderr and to `<log_dir>/<file_name>`. The level filter sits
//! behind a reload layer so `general.log_level` can change it without a
//! restart.

use crate::config::LoggingConfig;
use crate::{Error, Result};
use std::fmt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{info, warn};
use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

/// Dependencies that log too much at debug level
const QUIET_TARGETS: &str = "sqlx=warn,hyper=info,tower_http=info";

/// Levels selectable from the settings page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Name as stored in `general.log_level`
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }

    fn directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::new(format!("{},{}", self.directive(), QUIET_TARGETS))
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            _ => Err(Error::InvalidInput(format!("Unknown log level: {}", s))),
        }
    }
}

/// Handle for changing the active log level
#[derive(Clone)]
pub struct LogControl {
    handle: Option<reload::Handle<EnvFilter, Registry>>,
    level: Arc<RwLock<LogLevel>>,
    log_dir: PathBuf,
}

impl LogControl {
    /// Control not attached to a subscriber; level changes are only recorded
    pub fn detached(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            handle: None,
            level: Arc::new(RwLock::new(LogLevel::Info)),
            log_dir: log_dir.into(),
        }
    }

    /// Parse `level` and make it the active filter
    ///
    /// # Errors
    /// [`Error::InvalidInput`] for an unknown level name.
    pub fn update_level(&self, level: &str) -> Result<LogLevel> {
        let level: LogLevel = level.parse()?;

        if let Some(handle) = &self.handle {
            handle
                .reload(level.filter())
                .map_err(|e| Error::Internal(format!("Failed to reload log filter: {}", e)))?;
        }

        *self.level.write().unwrap_or_else(|e| e.into_inner()) = level;
        info!("Log level set to {}", level);
        Ok(level)
    }

    pub fn current_level(&self) -> LogLevel {
        *self.level.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn log_directory(&self) -> &Path {
        &self.log_dir
    }
}

impl fmt::Debug for LogControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogControl")
            .field("attached", &self.handle.is_some())
            .field("level", &self.current_level())
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence over the configured level until the first
/// [`LogControl::update_level`].
pub fn init_logging(config: &LoggingConfig, log_dir: &Path) -> Result<LogControl> {
    std::fs::create_dir_all(log_dir)?;
    let log_path = log_dir.join(&config.file_name);
    let file = OpenOptions::new().create(true).append(true).open(&log_path)?;

    let (initial_level, rejected) = configured_level(&config.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| initial_level.filter());
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .map_err(|e| Error::Internal(format!("Failed to install logger: {}", e)))?;

    info!("Logging to {}", log_path.display());
    if let Some(e) = rejected {
        warn!("{} in config, using {}", e, initial_level);
    }

    Ok(LogControl {
        handle: Some(handle),
        level: Arc::new(RwLock::new(initial_level)),
        log_dir: log_dir.to_path_buf(),
    })
}

/// Level named in the TOML file, INFO with the parse error when unknown
fn configured_level(configured: &str) -> (LogLevel, Option<Error>) {
    match configured.parse() {
        Ok(level) => (level, None),
        Err(e) => (LogLevel::Info, Some(e)),
    }
}

/// Most recently modified `*.log` file in `dir`
///
/// Blocking; async callers run it on the blocking pool.
///
/// # Errors
/// [`Error::NotFound`] if the directory does not exist or holds no log file.
pub fn latest_log_file(dir: &Path) -> Result<PathBuf> {
    if !dir.is_dir() {
        return Err(Error::NotFound(format!(
            "Log directory not found: {}",
            dir.display()
        )));
    }

    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("log") {
            continue;
        }
        let modified = std::fs::metadata(&path)?.modified()?;
        if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
            newest = Some((modified, path));
        }
    }

    newest
        .map(|(_, path)| path)
        .ok_or_else(|| Error::NotFound(format!("No log files in {}", dir.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    #[test]
    fn test_level_names() {
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("INFO".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("Warning".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("error".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert!(matches!("verbose".parse::<LogLevel>(), Err(Error::InvalidInput(_))));
        assert_eq!(LogLevel::Warning.to_string(), "WARNING");
    }

    #[test]
    fn test_unknown_configured_level_falls_back_to_info() {
        let (level, rejected) = configured_level("warn");
        assert_eq!(level, LogLevel::Warning);
        assert!(rejected.is_none());

        let (level, rejected) = configured_level("trace");
        assert_eq!(level, LogLevel::Info);
        assert!(matches!(rejected, Some(Error::InvalidInput(_))));
    }

    #[test]
    fn test_detached_control_records_level() {
        let control = LogControl::detached("/tmp");
        assert_eq!(control.current_level(), LogLevel::Info);

        assert_eq!(control.update_level("debug").unwrap(), LogLevel::Debug);
        assert_eq!(control.current_level(), LogLevel::Debug);

        assert!(control.update_level("loud").is_err());
        assert_eq!(control.current_level(), LogLevel::Debug);
    }

    #[test]
    fn test_latest_log_file_picks_newest() {
        let dir = TempDir::new().unwrap();
        let old = dir.path().join("old.log");
        let new = dir.path().join("new.log");
        std::fs::write(&old, "old").unwrap();
        std::fs::write(&new, "new").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let past = SystemTime::now() - Duration::from_secs(3600);
        std::fs::File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(past)
            .unwrap();

        assert_eq!(latest_log_file(dir.path()).unwrap(), new);
    }

    #[test]
    fn test_latest_log_file_not_found() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(latest_log_file(dir.path()), Err(Error::NotFound(_))));
        assert!(matches!(
            latest_log_file(&dir.path().join("missing")),
            Err(Error::NotFound(_))
        ));
    }
}
