//! Bootstrap configuration and root folder resolution
//!
//! Two tiers:
//! 1. **TOML bootstrap**: root folder, database path, listen address,
//!    logging. Read once at startup.
//! 2. **Database runtime**: everything else lives in `system_settings` and is
//!    managed by the settings registry.
//!
//! Root folder priority:
//! 1. Command-line argument
//! 2. `PARKER_ROOT_FOLDER` environment variable
//! 3. `root_folder` in the TOML file
//! 4. OS default (`<data_local_dir>/parker`)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "PARKER_ROOT_FOLDER";

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_DATABASE_FILE: &str = "parker.db";
pub const DEFAULT_LOG_FILE: &str = "parker.log";
pub const DEFAULT_EVENTS_FILE: &str = "events.json";

/// Bootstrap configuration loaded from TOML
///
/// Every field has a default, so an empty file (or no file at all) is valid.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Root folder for the database, logs and data files
    pub root_folder: Option<PathBuf>,

    /// SQLite database path; relative paths resolve against the root folder
    pub database_path: Option<PathBuf>,

    /// HTTP server port
    pub port: u16,

    /// HTTP bind address
    pub bind_address: String,

    pub logging: LoggingConfig,

    /// Event description table; relative paths resolve against the root folder
    pub event_descriptions_path: Option<PathBuf>,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            database_path: None,
            port: DEFAULT_PORT,
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            logging: LoggingConfig::default(),
            event_descriptions_path: None,
        }
    }
}

/// Logging section of the TOML file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Initial level (debug, info, warning or warn, error; any case).
    /// Unknown names fall back to info. `general.log_level` replaces it once
    /// the database is up
    pub level: String,

    /// Log directory; defaults to `<root>/logs`
    pub directory: Option<PathBuf>,

    /// Log file name inside the directory
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_name: DEFAULT_LOG_FILE.to_string(),
        }
    }
}

impl TomlConfig {
    /// Parse a TOML file
    ///
    /// # Errors
    /// [`Error::Io`] if the file cannot be read, [`Error::Config`] if it is
    /// not valid TOML for this schema.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load the first config file found, or defaults when there is none
    ///
    /// A missing file yields defaults. A file that exists but does not parse
    /// is an error. This runs before logging is set up, so nothing is logged
    /// here; report the returned [`ConfigSource`] once the subscriber exists.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, ConfigSource)> {
        let path = match explicit {
            Some(path) if !path.exists() => {
                return Ok((Self::default(), ConfigSource::Missing(path.to_path_buf())));
            }
            Some(path) => path.to_path_buf(),
            None => match find_config_file() {
                Some(path) => path,
                None => return Ok((Self::default(), ConfigSource::Defaults)),
            },
        };

        let config = Self::from_file(&path)?;
        Ok((config, ConfigSource::File(path)))
    }
}

/// Where the bootstrap configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// The given path does not exist; defaults apply
    Missing(PathBuf),
    /// No file at any default location; defaults apply
    Defaults,
}

impl ConfigSource {
    /// Report the outcome of [`TomlConfig::load`]
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded config from {}", path.display()),
            ConfigSource::Missing(path) => {
                warn!("Config file {} not found, using defaults", path.display())
            }
            ConfigSource::Defaults => warn!("No config file found, using defaults"),
        }
    }
}

/// Platform config file locations, in lookup order
pub fn config_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("parker").join("config.toml"));
    }
    if cfg!(target_os = "linux") {
        candidates.push(PathBuf::from("/etc/parker/config.toml"));
    }
    candidates
}

fn find_config_file() -> Option<PathBuf> {
    config_file_candidates().into_iter().find(|p| p.exists())
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("parker"))
        .unwrap_or_else(|| PathBuf::from("./parker_data"))
}

/// Resolve the root folder following the priority order above
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// Paths derived from the resolved root folder
#[derive(Debug, Clone, PartialEq)]
pub struct RootFolder {
    root: PathBuf,
}

impl RootFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Create the root folder if it does not exist; true when it was created
    pub fn ensure_directory_exists(&self) -> Result<bool> {
        if self.root.exists() {
            return Ok(false);
        }
        std::fs::create_dir_all(&self.root)?;
        Ok(true)
    }

    pub fn database_path(&self, config: &TomlConfig) -> PathBuf {
        self.resolve(config.database_path.as_deref(), DEFAULT_DATABASE_FILE)
    }

    pub fn log_directory(&self, config: &TomlConfig) -> PathBuf {
        self.resolve(config.logging.directory.as_deref(), "logs")
    }

    pub fn event_descriptions_path(&self, config: &TomlConfig) -> PathBuf {
        self.resolve(config.event_descriptions_path.as_deref(), DEFAULT_EVENTS_FILE)
    }

    fn resolve(&self, configured: Option<&Path>, default: &str) -> PathBuf {
        match configured {
            Some(path) if path.is_absolute() => path.to_path_buf(),
            Some(path) => self.root.join(path),
            None => self.root.join(default),
        }
    }
}
