//! The general configuration settings for keel.
//!
//! [General] is deserialized from the `[general]` table of keel.toml; [InternalGeneral] is the
//! clamped form used at runtime.

use crate::app::state::Settings;

use serde::Deserialize;

use std::time::Duration;

pub const DEFAULT_BULK_WORKERS: usize = 8;
pub const MAX_BULK_WORKERS: usize = 64;
pub const DEFAULT_NOTIFICATION_TIMEOUT_MS: u64 = 2000;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct General {
    show_hidden: bool,
    dirs_first: bool,
    bulk_workers: usize,
    notification_timeout_ms: u64,
    enable_pipe: bool,
    initial_mode: String,
}

impl Default for General {
    fn default() -> Self {
        General {
            show_hidden: false,
            dirs_first: true,
            bulk_workers: DEFAULT_BULK_WORKERS,
            notification_timeout_ms: DEFAULT_NOTIFICATION_TIMEOUT_MS,
            enable_pipe: true,
            initial_mode: "default".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalGeneral {
    show_hidden: bool,
    dirs_first: bool,
    bulk_workers: usize,
    notification_timeout: Duration,
    enable_pipe: bool,
    initial_mode: String,
}

impl From<General> for InternalGeneral {
    fn from(g: General) -> Self {
        Self {
            show_hidden: g.show_hidden,
            dirs_first: g.dirs_first,
            bulk_workers: g.bulk_workers.clamp(1, MAX_BULK_WORKERS),
            notification_timeout: Duration::from_millis(g.notification_timeout_ms.max(100)),
            enable_pipe: g.enable_pipe,
            initial_mode: g.initial_mode,
        }
    }
}

impl Default for InternalGeneral {
    fn default() -> Self {
        General::default().into()
    }
}

impl InternalGeneral {
    #[inline]
    pub fn show_hidden(&self) -> bool {
        self.show_hidden
    }

    #[inline]
    pub fn dirs_first(&self) -> bool {
        self.dirs_first
    }

    #[inline]
    pub fn bulk_workers(&self) -> usize {
        self.bulk_workers
    }

    #[inline]
    pub fn notification_timeout(&self) -> Duration {
        self.notification_timeout
    }

    #[inline]
    pub fn enable_pipe(&self) -> bool {
        self.enable_pipe
    }

    #[inline]
    pub fn initial_mode(&self) -> &str {
        &self.initial_mode
    }

    /// Runtime settings handed to the application state.
    pub fn settings(&self) -> Settings {
        Settings {
            show_hidden: self.show_hidden,
            dirs_first: self.dirs_first,
            notification_timeout: self.notification_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_clamped() -> Result<(), Box<dyn std::error::Error>> {
        let raw: General = toml::from_str("bulk_workers = 0\nnotification_timeout_ms = 5")?;
        let g = InternalGeneral::from(raw);
        assert_eq!(g.bulk_workers(), 1);
        assert_eq!(g.notification_timeout(), Duration::from_millis(100));
        assert!(g.dirs_first());

        let raw: General = toml::from_str("bulk_workers = 10000")?;
        assert_eq!(InternalGeneral::from(raw).bulk_workers(), MAX_BULK_WORKERS);
        Ok(())
    }
}
