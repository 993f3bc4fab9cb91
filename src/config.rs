//! User configuration.
//!
//! Settings come from an optional TOML file in the platform config directory,
//! can be overridden through environment variables, and are finally
//! overridden by the command line (see [`crate::cli`]).
use serde::Deserialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Environment variable overriding [`Config::default_player`]
pub const ENV_PLAYER: &str = "LEAGUE_CONTACTS_PLAYER";
/// Environment variable overriding [`Config::players_db`]
pub const ENV_PLAYERS_DB: &str = "LEAGUE_CONTACTS_PLAYERS_DB";
/// Environment variable overriding [`Config::log_filter`]
pub const ENV_LOG: &str = "LEAGUE_CONTACTS_LOG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file '{}': {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("Invalid config file '{}': {source}", .path.display())]
    Parse { path: PathBuf, source: toml::de::Error },
}

/// Effective settings for one run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Player looked up when no name is given on the command line
    pub default_player: String,
    /// Players database used when none is given on the command line
    pub players_db: String,
    /// `tracing` filter directive for the binary's own logs
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_player: "Chaichenets".to_owned(),
            players_db: "Rangliste Adressen.xls".to_owned(),
            log_filter: "league_contacts=warn".to_owned(),
        }
    }
}

impl Config {
    /// Loads the config file from its default location, applying environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::load_from_path(config_path())?;
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Loads a config file, falling back to defaults when it does not exist.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => {
                debug!(path = %path.display(), "loading config file");
                Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Parses TOML text; missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Replaces settings whose environment variable is set and not blank.
    ///
    /// `lookup` resolves a variable name, normally through `std::env::var`.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(player) = value(ENV_PLAYER) {
            self.default_player = player;
        }
        if let Some(players_db) = value(ENV_PLAYERS_DB) {
            self.players_db = players_db;
        }
        if let Some(log_filter) = value(ENV_LOG) {
            self.log_filter = log_filter;
        }
        self
    }

    /// Prints the effective configuration and where it was loaded from.
    pub fn display<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "Config file: {}", config_path().display())?;
        writeln!(writer, "Default player: {}", self.default_player)?;
        writeln!(writer, "Players database: {}", self.players_db)?;
        writeln!(writer, "Log filter: {}", self.log_filter)
    }
}

/// Platform specific location of the config file.
///
/// Falls back to the current directory when there is no config directory.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("league_contacts")
        .join("config.toml")
}
