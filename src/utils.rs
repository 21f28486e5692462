//! Miscellaneous utility functions for keel.
//!
//! This module holds the [helpers] submodule, which provides commonly used utilities such as:
//! - Resolving user supplied paths against the current directory
//! - Claiming an unused path for copy/move targets
//! - Recursive copy and delete used by the bulk workers
//! - Shortening the home directory path to "~"
//!
//! The [cli] submodule handles the small command-line surface of the `keel` binary.

pub mod cli;
pub mod helpers;

pub use helpers::{
    claim_unused_path, copy_recursive, copy_symlink, create_new_file, get_home, is_within,
    remove_recursive, resolve_path, shorten_home_path,
};
