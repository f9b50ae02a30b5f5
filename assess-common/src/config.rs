//! Bootstrap configuration and root folder resolution
//!
//! Bootstrap settings live in a small TOML file; everything tunable at runtime lives in
//! the `settings` table. Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. `ASSESS_ROOT_FOLDER` environment variable
//! 3. `root_folder` key of the module's TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "ASSESS_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "assess.db";

/// Bootstrap configuration loaded from TOML
///
/// Cannot change while a service is running.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP port override (optional)
    #[serde(default)]
    pub port: Option<u16>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or EnvFilter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Compiled defaults used when no other configuration source is present
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
        }
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/assess
        dirs::data_local_dir()
            .map(|d| d.join("assess"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/assess"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/assess
        dirs::data_dir()
            .map(|d| d.join("assess"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/assess"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\assess
        dirs::data_local_dir()
            .map(|d| d.join("assess"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\assess"))
    } else {
        PathBuf::from("./assess_data")
    }
}

/// Default TOML config path for a module (`<config dir>/assess/<module>.toml`)
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("assess").join(format!("{}.toml", module_name)))
}

/// Load a TOML config file
///
/// A missing file is not an error: defaults are returned with a warning.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!("Config file not found, using defaults: {}", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;

    info!("Loaded config file: {}", path.display());
    Ok(config)
}

/// Resolves the root folder for a module
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_config: Option<TomlConfig>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
            toml_config: None,
        }
    }

    /// Highest priority override from the command line
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    /// Use an already loaded TOML config instead of reading the default file
    pub fn with_toml_config(mut self, config: TomlConfig) -> Self {
        self.toml_config = Some(config);
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        let from_toml = match &self.toml_config {
            Some(config) => config.root_folder.clone(),
            None => default_config_path(&self.module_name)
                .filter(|p| p.exists())
                .and_then(|p| load_toml_config(&p).ok())
                .and_then(|c| c.root_folder),
        };
        if let Some(path) = from_toml {
            return path;
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Prepares the root folder on disk
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create the root folder if missing (idempotent)
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }
}
