use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ExtractError;

/// Top-level configuration for exif-extract.
///
/// Controls the report layout (separator, directory columns) and how the
/// scan runs (worker pool size, error handling, extension matching).
///
/// # Loading
///
/// ```rust,no_run
/// use exif_extract::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.report.separator = ";".into();
/// config.scan.concurrency = 4;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Report layout.
    pub report: ReportConfig,
    /// Traversal and extraction behavior.
    pub scan: ScanConfig,
}

/// Controls how the table is laid out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Field separator, also the only character sequence that gets escaped.
    pub separator: String,
    /// Emit `Directory1..DirectoryN` columns before the filename.
    pub include_directories: bool,
}

/// Controls how files are discovered and decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Maximum number of concurrent directory listings and metadata decodes.
    pub concurrency: usize,
    /// What to do when a single file cannot be decoded.
    pub error_mode: ErrorMode,
    /// Match `JPG`, `Tiff`, ... as well as the lowercase extensions.
    pub case_insensitive_extensions: bool,
}

/// Batch behavior when one file fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMode {
    /// Abort the whole run on the first failure. No report is written.
    #[default]
    FailFast,
    /// Skip failing files and report them in a summary.
    BestEffort,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            separator: ",".to_string(),
            include_directories: true,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: 16,
            error_mode: ErrorMode::FailFast,
            case_insensitive_extensions: false,
        }
    }
}

impl Config {
    /// Resolve the config file path — same directory as the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    ///
    /// A missing file is not an error: defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> std::result::Result<(), ExtractError> {
        if self.report.separator.is_empty() {
            return Err(ExtractError::config("separator must not be empty"));
        }
        if self.scan.concurrency == 0 {
            return Err(ExtractError::config("concurrency must be at least 1"));
        }
        Ok(())
    }
}
