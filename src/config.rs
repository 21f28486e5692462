//! Configuration for keel.
//!
//! - [general]: the `[general]` table and its runtime form.
//! - [modes]: `[modes.<name>]` tables compiled into modes.
//! - [load]: locating, layering and loading keel.toml.

pub mod general;
pub mod load;
pub mod modes;

pub use general::{General, InternalGeneral};
pub use load::{Config, ConfigError, DEFAULT_CONFIG};
pub use modes::{RawAction, RawMode};
