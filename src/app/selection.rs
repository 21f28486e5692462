//! The set of selected paths.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct Selection {
    paths: HashSet<PathBuf>,
}

impl Selection {
    /// Flips membership of `path`. Returns `true` if it is now selected.
    pub fn toggle(&mut self, path: PathBuf) -> bool {
        if self.paths.remove(&path) {
            false
        } else {
            self.paths.insert(path);
            true
        }
    }

    pub fn insert(&mut self, path: PathBuf) {
        self.paths.insert(path);
    }

    pub fn remove(&mut self, path: &Path) -> bool {
        self.paths.remove(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Selected paths in a stable order.
    pub fn sorted(&self) -> Vec<PathBuf> {
        let mut v: Vec<PathBuf> = self.paths.iter().cloned().collect();
        v.sort();
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_twice_restores() {
        let mut sel = Selection::default();
        let p = PathBuf::from("/x/y");
        assert!(sel.toggle(p.clone()));
        assert!(sel.contains(&p));
        assert!(!sel.toggle(p.clone()));
        assert!(sel.is_empty());
    }

    #[test]
    fn sorted_is_stable() {
        let mut sel = Selection::default();
        for name in ["/c", "/a", "/b"] {
            sel.insert(PathBuf::from(name));
        }
        sel.insert(PathBuf::from("/a"));
        assert_eq!(sel.len(), 3);
        assert_eq!(
            sel.sorted(),
            vec![PathBuf::from("/a"), PathBuf::from("/b"), PathBuf::from("/c")]
        );
        sel.remove(Path::new("/b"));
        assert!(!sel.contains(Path::new("/b")));
    }
}
