//! Directory browsing logic for keel.
//!
//! Provides the [Node] struct which is used throughout keel for directory listings.
//! Nodes are created and populated by the [browse_dir] function on a worker thread.

use std::borrow::Cow;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Represents a single entry in a directory listing
/// Holds the name, the absolute path and attributes like is_dir, is_hidden, is_symlink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    name: Box<OsStr>,
    path: PathBuf,
    flags: u8,
}

impl Node {
    // Flag bit definitions
    pub const IS_DIR: u8 = 1 << 0;
    pub const IS_HIDDEN: u8 = 1 << 1;
    pub const IS_SYMLINK: u8 = 1 << 2;
    pub const IS_BROKEN_SYM: u8 = 1 << 3;

    pub fn new(path: PathBuf, flags: u8) -> Self {
        let name = path.file_name().unwrap_or(path.as_os_str()).into();
        Node { name, path, flags }
    }

    // Accessors

    #[inline]
    pub fn name(&self) -> &OsStr {
        &self.name
    }

    #[inline]
    pub fn name_str(&self) -> Cow<'_, str> {
        self.name.to_string_lossy()
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.flags & Self::IS_DIR != 0
    }

    #[inline]
    pub fn is_hidden(&self) -> bool {
        self.flags & Self::IS_HIDDEN != 0
    }

    #[inline]
    pub fn is_symlink(&self) -> bool {
        self.flags & Self::IS_SYMLINK != 0
    }

    #[inline]
    pub fn is_broken_sym(&self) -> bool {
        self.flags & Self::IS_BROKEN_SYM != 0
    }
}

/// Reads the contents of the provided directory and returns them as [Node]s.
///
/// Hidden entries are dropped unless `show_hidden` is set. Entries are ordered by name,
/// case-insensitively, with directories first when `dirs_first` is set.
pub fn browse_dir(path: &Path, show_hidden: bool, dirs_first: bool) -> io::Result<Vec<Node>> {
    let mut nodes = Vec::with_capacity(256);

    for entry in fs::read_dir(path)? {
        let Ok(entry) = entry else {
            continue;
        };
        let Ok(ft) = entry.file_type() else {
            continue;
        };

        let name = entry.file_name();
        let mut flags = 0u8;
        if ft.is_dir() {
            flags |= Node::IS_DIR;
        }
        if ft.is_symlink() {
            flags |= Node::IS_SYMLINK;
            match fs::metadata(entry.path()) {
                Ok(md) if md.is_dir() => flags |= Node::IS_DIR,
                Ok(_) => {}
                Err(_) => flags |= Node::IS_BROKEN_SYM,
            }
        }
        if name.to_string_lossy().starts_with('.') {
            flags |= Node::IS_HIDDEN;
        }

        if !show_hidden && flags & Node::IS_HIDDEN != 0 {
            continue;
        }
        nodes.push(Node::new(entry.path(), flags));
    }

    nodes.sort_by_cached_key(|n| {
        let group = if dirs_first && !n.is_dir() { 1u8 } else { 0 };
        (group, n.name_str().to_lowercase())
    });
    Ok(nodes)
}
