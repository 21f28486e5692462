//! Navigation state and directory listing logic for keel.
//!
//! Tracks the present working directory, its listing, the focused entry and the request id that
//! guards against stale directory loads. Also provides the focus recovery used after bulk
//! operations change the listing under the cursor.

use crate::core::Node;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The focused entry and listing captured before a bulk job, used to recover focus afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusSnapshot {
    pub dir: PathBuf,
    pub listing: Vec<PathBuf>,
    pub focus: usize,
}

/// Holds the working directory, its listing and the focus.
pub struct NavState {
    pwd: PathBuf,
    nodes: Vec<Node>,
    focus: usize,
    positions: HashMap<PathBuf, PathBuf>,
    request_id: u64,
}

impl NavState {
    pub fn new(path: PathBuf) -> Self {
        Self {
            pwd: path,
            nodes: Vec::new(),
            focus: 0,
            positions: HashMap::new(),
            request_id: 0,
        }
    }

    // Getters / Accessors

    #[inline]
    pub fn pwd(&self) -> &Path {
        &self.pwd
    }

    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[inline]
    pub fn focus_idx(&self) -> usize {
        self.focus
    }

    #[inline]
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    pub fn focused_node(&self) -> Option<&Node> {
        self.nodes.get(self.focus)
    }

    pub fn focused_path(&self) -> Option<&Path> {
        self.focused_node().map(Node::path)
    }

    // Navigation functions

    /// Prepares a new load request for the current directory.
    pub fn prepare_new_request(&mut self) -> u64 {
        self.request_id = self.request_id.wrapping_add(1);
        self.request_id
    }

    /// Changes the working directory and returns the request id the load must carry.
    ///
    /// The listing is emptied until the load arrives. The focus of the directory being left is
    /// remembered so returning to it restores it.
    pub fn set_path(&mut self, path: PathBuf) -> u64 {
        self.save_position();
        self.pwd = path;
        self.nodes.clear();
        self.focus = 0;
        self.prepare_new_request()
    }

    /// Installs a loaded listing.
    ///
    /// Focus goes to `focus` when it is present in the listing, otherwise to the remembered
    /// position for the directory, otherwise to the first entry.
    pub fn update_from_worker(&mut self, path: PathBuf, nodes: Vec<Node>, focus: Option<PathBuf>) {
        self.pwd = path;
        self.nodes = nodes;

        let target = focus.or_else(|| self.positions.get(&self.pwd).cloned());
        self.focus = target
            .and_then(|t| self.nodes.iter().position(|n| n.path() == t))
            .unwrap_or(0);
    }

    /// Moves focus down by one entry, wrapping around.
    /// Returns `false` if there are no entries.
    pub fn focus_next(&mut self) -> bool {
        let len = self.nodes.len();
        if len == 0 {
            return false;
        }
        self.focus = (self.focus + 1) % len;
        true
    }

    /// Moves focus up by one entry, wrapping around.
    /// Returns `false` if there are no entries.
    pub fn focus_previous(&mut self) -> bool {
        let len = self.nodes.len();
        if len == 0 {
            return false;
        }
        self.focus = if self.focus == 0 { len - 1 } else { self.focus - 1 };
        true
    }

    pub fn focus_first(&mut self) {
        self.focus = 0;
    }

    pub fn focus_last(&mut self) {
        self.focus = self.nodes.len().saturating_sub(1);
    }

    /// Focuses the entry at `idx`. Returns `false` if out of range.
    pub fn focus_by_index(&mut self, idx: usize) -> bool {
        if idx < self.nodes.len() {
            self.focus = idx;
            true
        } else {
            false
        }
    }

    /// Focuses the entry with the given path. Returns `false` if it is not listed.
    pub fn focus_path(&mut self, path: &Path) -> bool {
        match self.nodes.iter().position(|n| n.path() == path) {
            Some(idx) => {
                self.focus = idx;
                true
            }
            None => false,
        }
    }

    /// Captures the current listing and focus.
    pub fn snapshot(&self) -> FocusSnapshot {
        FocusSnapshot {
            dir: self.pwd.clone(),
            listing: self.nodes.iter().map(|n| n.path().to_path_buf()).collect(),
            focus: self.focus,
        }
    }

    fn save_position(&mut self) {
        if let Some(path) = self.focused_path() {
            let path = path.to_path_buf();
            self.positions.insert(self.pwd.clone(), path);
        }
    }
}

/// Picks the entry to focus once the listing has changed.
///
/// Searches `listing` forward from the former focus index for the first path that still
/// exists, then backward from just before it. Returns `None` when nothing survived.
pub fn recover_focus<F>(listing: &[PathBuf], former: usize, exists: F) -> Option<PathBuf>
where
    F: Fn(&Path) -> bool,
{
    if listing.is_empty() {
        return None;
    }
    let start = former.min(listing.len() - 1);
    listing[start..]
        .iter()
        .find(|p| exists(p))
        .or_else(|| listing[..start].iter().rev().find(|p| exists(p)))
        .cloned()
}
