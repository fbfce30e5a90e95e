use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::UserDirs;
use dotenvy::dotenv;
use serde::Deserialize;

/// Prefix shared by every configuration variable.
pub const ENV_PREFIX: &str = "TIMELINE_IQ_";

const DATABASE_FILE: &str = "TimelineIQ.db";
const LOG_FILE: &str = "log.txt";

/// Configuration for the application
#[derive(Debug, Deserialize)]
pub struct Config {
    /// SQLite file holding the projects table
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Folder receiving CSV and monthly report exports
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,

    /// Append-only diagnostics log
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Variables from a `.env` file are loaded first if one exists; every
    /// field falls back to a default next to the executable or on the
    /// user's desktop.
    pub fn load() -> Result<Self> {
        dotenv().ok();

        Self::from_vars(std::env::vars())
    }

    /// Deserialize from an explicit set of variables
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::prefixed(ENV_PREFIX)
            .from_iter::<_, Config>(vars)
            .context("invalid TIMELINE_IQ_* configuration")?;

        Ok(config)
    }

    /// Replace configured locations with command-line overrides
    pub fn with_overrides(mut self, database: Option<PathBuf>, export_dir: Option<PathBuf>) -> Self {
        if let Some(path) = database {
            self.database_path = path;
        }
        if let Some(dir) = export_dir {
            self.export_dir = dir;
        }
        self
    }

    /// Resolve every path against `base` once, so later calls never depend
    /// on the working directory.
    pub fn absolutize(mut self, base: &Path) -> Self {
        self.database_path = absolute(base, self.database_path);
        self.export_dir = absolute(base, self.export_dir);
        self.log_path = absolute(base, self.log_path);
        self
    }
}

/// Load the configuration, apply overrides and make all paths absolute
pub fn init(database: Option<PathBuf>, export_dir: Option<PathBuf>) -> Result<Config> {
    let cwd = std::env::current_dir().context("cannot determine the current directory")?;

    let config = Config::load()?
        .with_overrides(database, export_dir)
        .absolutize(&cwd);

    Ok(config)
}

fn absolute(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() { path } else { base.join(path) }
}

fn executable_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_database_path() -> PathBuf {
    executable_dir().join(DATABASE_FILE)
}

pub fn default_log_path() -> PathBuf {
    executable_dir().join(LOG_FILE)
}

fn default_export_dir() -> PathBuf {
    UserDirs::new()
        .and_then(|dirs| {
            dirs.desktop_dir()
                .map(Path::to_path_buf)
                .or_else(|| Some(dirs.home_dir().to_path_buf()))
        })
        .unwrap_or_else(|| PathBuf::from("."))
}
