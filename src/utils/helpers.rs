//! Helpers for keel.
//!
//! Small path and filesystem utilities shared by the navigation handlers and the bulk
//! file-operation workers:
//! - Resolving relative and `~` prefixed paths
//! - Claiming unused filenames so copies and moves never overwrite
//! - Recursive copy and removal that never follow symlinks
//! - Displaying home directories as "~" in file paths

use std::path::{Component, MAIN_SEPARATOR, Path, PathBuf};
use std::{fs, io};

/// Returns the home directory of the current user, if it can be determined.
pub fn get_home() -> Option<PathBuf> {
    dirs::home_dir()
}

/// Resolves a user supplied path against `base`.
///
/// Expands a leading `~`, joins relative paths onto `base` and lexically removes `.` and `..`
/// components. The filesystem is not touched.
pub fn resolve_path(base: &Path, input: &str) -> PathBuf {
    let expanded = if input == "~" {
        get_home().unwrap_or_else(|| PathBuf::from(input))
    } else if let Some(rest) = input.strip_prefix("~/") {
        match get_home() {
            Some(home) => home.join(rest),
            None => PathBuf::from(input),
        }
    } else {
        PathBuf::from(input)
    };

    let joined = if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    };

    let mut out = PathBuf::new();
    for comp in joined.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Returns true if `path` is `ancestor` or lives somewhere below it.
pub fn is_within(path: &Path, ancestor: &Path) -> bool {
    path.starts_with(ancestor)
}

/// Returns `path` with `_n` appended to its stem; `n == 0` is the path itself.
///
/// Example: ("notes.txt", 1) -> "notes_1.txt"
fn numbered_path(path: &Path, n: usize) -> PathBuf {
    if n == 0 {
        return path.to_path_buf();
    }
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let name = path.file_name().unwrap_or_default();

    let stem = Path::new(name)
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy();

    let ext = Path::new(name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    parent.join(format!("{}_{}{}", stem, n, ext))
}

/// Claims the first free name among `path`, `stem_1.ext`, `stem_2.ext`, ...
///
/// `claim` creates the entry and must fail with `AlreadyExists` when the name is taken
/// (`create_new`, `create_dir`, `symlink`). The name is only returned once the entry exists,
/// so concurrent callers targeting the same directory never end up with the same path.
pub fn claim_unused_path<T>(
    path: &Path,
    mut claim: impl FnMut(&Path) -> io::Result<T>,
) -> io::Result<(PathBuf, T)> {
    let mut n = 0;
    loop {
        let candidate = numbered_path(path, n);
        match claim(&candidate) {
            Ok(value) => return Ok((candidate, value)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => n += 1,
            Err(e) => return Err(e),
        }
    }
}

/// Creates an empty file at `path`, failing if anything already exists there.
pub fn create_new_file(path: &Path) -> io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
}

/// Recursively copies files and directories from `src` to `dest`.
///
/// Directories are recreated, symlinks are copied as links (unix) and never followed.
pub fn copy_recursive(src: &Path, dest: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(src)?;
    if meta.file_type().is_symlink() {
        return copy_symlink(src, dest);
    }

    if meta.is_dir() {
        fs::create_dir_all(dest)?;
        for entry in fs::read_dir(src)? {
            let entry = entry?;
            let entry_path = entry.path();
            let dest_path = dest.join(entry.file_name());
            copy_recursive(&entry_path, &dest_path)?;
        }
        fs::set_permissions(dest, meta.permissions())?;
    } else {
        fs::copy(src, dest)?;
    }
    Ok(())
}

/// Recreates the symlink `src` at `dest` without following it.
#[cfg(unix)]
pub fn copy_symlink(src: &Path, dest: &Path) -> io::Result<()> {
    let target = fs::read_link(src)?;
    std::os::unix::fs::symlink(target, dest)
}

#[cfg(not(unix))]
pub fn copy_symlink(src: &Path, dest: &Path) -> io::Result<()> {
    fs::copy(src, dest).map(|_| ())
}

/// Removes `path` recursively. Symlinks are removed, not followed.
pub fn remove_recursive(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Util function to shorten home directory to ~.
/// Is used by the header line in the ui render function.
pub fn shorten_home_path<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();
    if let Some(home_dir) = get_home()
        && let Ok(stripped) = path.strip_prefix(&home_dir)
    {
        if stripped.as_os_str().is_empty() {
            return "~".to_string();
        } else {
            let mut short = stripped.display().to_string();
            if short.starts_with(MAIN_SEPARATOR) {
                short.remove(0);
            }
            return format!("~{}{}", MAIN_SEPARATOR, short);
        }
    }
    path.display().to_string()
}

/// Helper utils integration tests
#[cfg(test)]
mod tests {
    use super::*;

    use std::error;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_path_collision_increments() -> Result<(), Box<dyn error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("data.csv");

        let (first, _) = claim_unused_path(&path, create_new_file)?;
        assert_eq!(first, path);

        let (second, _) = claim_unused_path(&path, create_new_file)?;
        assert_eq!(second, dir.path().join("data_1.csv"));

        let (third, _) = claim_unused_path(&path, create_new_file)?;
        assert_eq!(third, dir.path().join("data_2.csv"));
        Ok(())
    }

    #[test]
    fn test_hidden_file_collision() -> Result<(), Box<dyn error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join(".gitignore");

        File::create(&path)?;
        let (claimed, _) = claim_unused_path(&path, create_new_file)?;
        assert_eq!(claimed, dir.path().join(".gitignore_1"));
        Ok(())
    }

    #[test]
    fn test_claim_dir_skips_existing_file() -> Result<(), Box<dyn error::Error>> {
        let dir = tempdir()?;
        let folder_path = dir.path().join("my_folder");

        File::create(&folder_path)?;
        let (claimed, ()) = claim_unused_path(&folder_path, |p| fs::create_dir(p))?;
        assert_eq!(claimed, dir.path().join("my_folder_1"));
        assert!(claimed.is_dir());
        Ok(())
    }

    #[test]
    fn test_claim_propagates_other_errors() -> Result<(), Box<dyn error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("missing/child.txt");

        let err = claim_unused_path(&path, create_new_file)
            .err()
            .ok_or("expected an error")?;
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        Ok(())
    }

    #[test]
    fn resolve_path_relative_and_dots() {
        let base = Path::new("/srv/data");
        assert_eq!(resolve_path(base, "logs"), PathBuf::from("/srv/data/logs"));
        assert_eq!(resolve_path(base, "../etc"), PathBuf::from("/srv/etc"));
        assert_eq!(resolve_path(base, "./a/./b"), PathBuf::from("/srv/data/a/b"));
        assert_eq!(resolve_path(base, "/tmp/x"), PathBuf::from("/tmp/x"));
    }

    #[test]
    fn copy_and_remove_recursive_tree() -> Result<(), Box<dyn error::Error>> {
        let dir = tempdir()?;
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("nested/deeper"))?;
        fs::write(src.join("top.txt"), b"top")?;
        fs::write(src.join("nested/deeper/leaf.txt"), b"leaf")?;

        let dest = dir.path().join("dest");
        copy_recursive(&src, &dest)?;
        assert_eq!(fs::read(dest.join("top.txt"))?, b"top");
        assert_eq!(fs::read(dest.join("nested/deeper/leaf.txt"))?, b"leaf");

        remove_recursive(&src)?;
        assert!(!src.exists());
        assert!(dest.exists());
        Ok(())
    }

    #[test]
    fn is_within_matches_components() {
        assert!(is_within(Path::new("/a/b/c"), Path::new("/a/b")));
        assert!(is_within(Path::new("/a/b"), Path::new("/a/b")));
        assert!(!is_within(Path::new("/a/bc"), Path::new("/a/b")));
    }
}
