//! The main config loading module for keel.
//!
//! The built-in configuration (`default.toml`, embedded at compile time) is always loaded
//! first. The user's keel.toml is then layered on top: its `[general]` table replaces the
//! built-in one and its `[modes.*]` tables are merged key by key.
//!
//! Loading never fails because of the user file. Read and parse errors, invalid keys and
//! invalid command lines are collected as warnings and shown once the UI is up.

use crate::app::command::HandlerRegistry;
use crate::app::mode::{Mode, ModeError, ModeStack};
use crate::config::general::{General, InternalGeneral};
use crate::config::modes::{RawMode, check_mode_targets, merge_modes};
use crate::utils::get_home;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::{fs, io};

/// The built-in configuration, also written out by `keel --init`.
pub const DEFAULT_CONFIG: &str = include_str!("default.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not parse {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Raw configuration as read from a toml file.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub(crate) struct RawConfig {
    general: Option<General>,
    modes: HashMap<String, RawMode>,
}

impl RawConfig {
    fn parse(src: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(src).map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })
    }
}

/// Processed configuration: general settings, compiled modes and any warnings.
#[derive(Debug)]
pub struct Config {
    general: InternalGeneral,
    modes: HashMap<String, Mode>,
    warnings: Vec<String>,
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// Only an unusable built-in configuration is an error; problems with the user's file
    /// end up in [Config::warnings].
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!(path = %path.display(), "no config file, using built-in defaults");
            return Self::builtin();
        }

        let user = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
            .and_then(|src| RawConfig::parse(&src, &path.display().to_string()));

        match user {
            Ok(raw) => Self::build(Some(raw)),
            Err(e) => {
                let mut config = Self::builtin()?;
                config.warnings.insert(0, e.to_string());
                Ok(config)
            }
        }
    }

    /// The built-in configuration alone.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::build(None)
    }

    /// Built-in configuration overlaid with `src`.
    pub fn from_toml(src: &str) -> Result<Self, ConfigError> {
        Self::build(Some(RawConfig::parse(src, "config")?))
    }

    fn build(user: Option<RawConfig>) -> Result<Self, ConfigError> {
        let registry = HandlerRegistry::builtin();
        let builtin = RawConfig::parse(DEFAULT_CONFIG, "built-in config")?;

        let mut warnings = Vec::new();
        let mut modes = HashMap::new();
        merge_modes(&mut modes, &builtin.modes, &registry, &mut warnings);

        let mut general = builtin.general.unwrap_or_default();
        if let Some(user) = user {
            if let Some(g) = user.general {
                general = g;
            }
            merge_modes(&mut modes, &user.modes, &registry, &mut warnings);
        }
        check_mode_targets(&modes, &mut warnings);

        Ok(Self {
            general: general.into(),
            modes,
            warnings,
        })
    }

    // Getters

    #[inline]
    pub fn general(&self) -> &InternalGeneral {
        &self.general
    }

    #[inline]
    pub fn modes(&self) -> &HashMap<String, Mode> {
        &self.modes
    }

    #[inline]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Builds the mode stack rooted at the configured initial mode.
    ///
    /// An unknown initial mode falls back to `default` with a warning.
    pub fn mode_stack(&mut self) -> Result<ModeStack, ModeError> {
        let initial = self.general.initial_mode().to_string();
        if self.modes.contains_key(&initial) {
            return ModeStack::new(self.modes.clone(), &initial);
        }
        self.warnings
            .push(format!("general.initial_mode: unknown mode '{initial}', using 'default'"));
        ModeStack::new(self.modes.clone(), "default")
    }

    /// Determine the default configuration file path.
    /// Checks the KEEL_CONFIG environment variable first,
    /// then XDG_CONFIG_HOME,
    /// then defaults to ~/.config/keel/keel.toml.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var("KEEL_CONFIG") {
            return PathBuf::from(path);
        }

        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg_config).join("keel/keel.toml");
        }

        if let Some(home) = get_home() {
            return home.join(".config/keel/keel.toml");
        }
        PathBuf::from("keel.toml")
    }

    /// Writes the built-in configuration to `path`.
    /// If the file already exists, returns an error.
    pub fn generate_default(path: &Path) -> io::Result<()> {
        if path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("Config file already exists at {:?}", path),
            ));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, DEFAULT_CONFIG)
    }
}
