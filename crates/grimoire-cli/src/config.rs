//! Replay tool configuration, read from the environment.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::AppError;

/// Environment variable naming the log file.
pub const LOG_PATH_VAR: &str = "GRIMOIRE_LOG_PATH";

/// Environment variable selecting the output format.
pub const LOG_FORMAT_VAR: &str = "GRIMOIRE_LOG_FORMAT";

/// Output format for diagnostics and the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Pretty,
    /// One JSON document.
    Json,
}

impl FromStr for OutputFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(AppError::Config(format!(
                "{LOG_FORMAT_VAR} must be 'pretty' or 'json', got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
        })
    }
}

/// Resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// The log file to replay.
    pub log_path: PathBuf,
    /// How to print diagnostics and the report.
    pub format: OutputFormat,
}

impl Config {
    /// Reads the settings from the process environment. A path given on the
    /// command line wins over `GRIMOIRE_LOG_PATH`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if no log path is given or the format is
    /// not recognised.
    pub fn from_env(path_arg: Option<String>) -> Result<Self, AppError> {
        Self::from_lookup(path_arg, |key| std::env::var(key).ok())
    }

    /// Like [`Config::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`Config::from_env`].
    pub fn from_lookup(
        path_arg: Option<String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let log_path = path_arg
            .or_else(|| lookup(LOG_PATH_VAR))
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| {
                AppError::Config(format!(
                    "pass a log file or set the {LOG_PATH_VAR} environment variable"
                ))
            })?;
        let format = lookup(LOG_FORMAT_VAR)
            .map(|value| value.parse())
            .transpose()?
            .unwrap_or_default();
        Ok(Self { log_path, format })
    }
}
