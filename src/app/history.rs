//! Directory visit history.
//!
//! An append-only list of visited directories with a cursor. Visiting a new directory appends
//! it and moves the cursor to the end; stepping back and forth only moves the cursor, so no
//! entry is ever discarded.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct History {
    paths: Vec<PathBuf>,
    cursor: usize,
}

impl History {
    pub fn new(start: PathBuf) -> Self {
        Self {
            paths: vec![start],
            cursor: 0,
        }
    }

    /// Records a visit. Consecutive visits to the same directory collapse into one entry.
    pub fn push(&mut self, path: PathBuf) {
        if self.paths.last() != Some(&path) {
            self.paths.push(path);
        }
        self.cursor = self.paths.len() - 1;
    }

    /// The entry before the cursor, or `None` at the oldest entry.
    pub fn peek_last(&self) -> Option<&Path> {
        let i = self.cursor.checked_sub(1)?;
        self.paths.get(i).map(PathBuf::as_path)
    }

    /// The entry after the cursor, or `None` at the newest entry.
    pub fn peek_next(&self) -> Option<&Path> {
        self.paths.get(self.cursor + 1).map(PathBuf::as_path)
    }

    pub fn step_back(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn step_forward(&mut self) {
        if self.cursor + 1 < self.paths.len() {
            self.cursor += 1;
        }
    }

    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[inline]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visits_stay_in_bounds() {
        let mut h = History::new(PathBuf::from("/"));
        h.push(PathBuf::from("/a"));
        h.push(PathBuf::from("/a"));
        h.push(PathBuf::from("/b"));
        assert_eq!(h.paths().len(), 3);

        assert_eq!(h.peek_next(), None);
        assert_eq!(h.peek_last(), Some(Path::new("/a")));
        assert_eq!(h.cursor(), 2);

        h.step_back();
        assert_eq!(h.peek_last(), Some(Path::new("/")));
        h.step_back();
        assert_eq!(h.peek_last(), None);
        h.step_back();
        assert_eq!(h.cursor(), 0);
        assert_eq!(h.peek_next(), Some(Path::new("/a")));

        h.step_forward();
        h.step_forward();
        h.step_forward();
        assert_eq!(h.cursor(), 2);
    }

    #[test]
    fn push_after_going_back_keeps_entries() {
        let mut h = History::new(PathBuf::from("/"));
        h.push(PathBuf::from("/a"));
        h.push(PathBuf::from("/b"));
        h.step_back();
        h.step_back();
        h.push(PathBuf::from("/c"));

        assert_eq!(
            h.paths(),
            &[
                PathBuf::from("/"),
                PathBuf::from("/a"),
                PathBuf::from("/b"),
                PathBuf::from("/c")
            ]
        );
        assert_eq!(h.cursor(), 3);
    }
}
