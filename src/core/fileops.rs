//! Single-path filesystem operations used by the bulk workers.
//!
//! Each function performs the OS-level work for exactly one source path and classifies any
//! failure into a [FileOpError]. Name collisions in the destination are resolved by
//! auto-renaming the target (see [claim_unused_path]). The target is created before any data is
//! written, so workers running at the same time never pick the same name.

use crate::utils::{
    claim_unused_path, copy_recursive, copy_symlink, create_new_file, is_within,
    remove_recursive,
};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Per-item failure of a file operation.
#[derive(Debug, Error)]
pub enum FileOpError {
    #[error("permission denied during {operation}: {path}")]
    PermissionDenied {
        operation: &'static str,
        path: PathBuf,
    },
    #[error("path not found during {operation}: {path}")]
    NotFound {
        operation: &'static str,
        path: PathBuf,
    },
    #[error("io error during {operation} for {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("conflict during {operation}: {path} ({reason})")]
    Conflict {
        operation: &'static str,
        path: PathBuf,
        reason: String,
    },
}

impl FileOpError {
    pub fn from_io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { operation, path },
            io::ErrorKind::NotFound => Self::NotFound { operation, path },
            _ => Self::Io {
                operation,
                path,
                source,
            },
        }
    }

    pub fn conflict(
        operation: &'static str,
        path: impl Into<PathBuf>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            operation,
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Removes `path`, recursively for directories.
pub fn delete_path(path: &Path) -> Result<(), FileOpError> {
    remove_recursive(path).map_err(|e| FileOpError::from_io("delete", path, e))
}

/// Copies `src` into `dest_dir`, returning the path that was written.
pub fn copy_into(src: &Path, dest_dir: &Path) -> Result<PathBuf, FileOpError> {
    let (meta, wanted) = prepare_target("copy", src, dest_dir)?;
    let ft = meta.file_type();

    let (target, out) = claim_unused_path(&wanted, |candidate| {
        if ft.is_symlink() {
            copy_symlink(src, candidate).map(|()| None)
        } else if ft.is_dir() {
            fs::create_dir(candidate).map(|()| None)
        } else {
            create_new_file(candidate).map(Some)
        }
    })
    .map_err(|e| FileOpError::from_io("copy", dest_dir, e))?;

    let filled = match out {
        Some(mut out) => fs::File::open(src)
            .and_then(|mut input| io::copy(&mut input, &mut out))
            .and_then(|_| fs::set_permissions(&target, meta.permissions())),
        None if ft.is_dir() => copy_recursive(src, &target),
        None => Ok(()),
    };
    filled.map_err(|e| {
        cleanup_partial(&target);
        FileOpError::from_io("copy", src, e)
    })?;
    Ok(target)
}

/// Moves `src` into `dest_dir`, returning the new path.
///
/// The target name is reserved with an empty placeholder of the same kind, which the rename
/// then replaces. Falls back to copy-then-delete when the rename crosses a device boundary.
pub fn move_into(src: &Path, dest_dir: &Path) -> Result<PathBuf, FileOpError> {
    if src.parent() == Some(dest_dir) {
        return Err(FileOpError::conflict(
            "move",
            src,
            "already in destination directory",
        ));
    }
    let (meta, wanted) = prepare_target("move", src, dest_dir)?;
    let is_dir = meta.is_dir();

    let (target, ()) = claim_unused_path(&wanted, |candidate| {
        if is_dir {
            fs::create_dir(candidate)
        } else {
            create_new_file(candidate).map(drop)
        }
    })
    .map_err(|e| FileOpError::from_io("move", dest_dir, e))?;

    match fs::rename(src, &target) {
        Ok(()) => Ok(target),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            move_by_copy(src, &target)?;
            Ok(target)
        }
        Err(e) => {
            cleanup_partial(&target);
            Err(FileOpError::from_io("move", src, e))
        }
    }
}

/// Moves `src` onto its reserved `target` by copying it and deleting the source.
fn move_by_copy(src: &Path, target: &Path) -> Result<(), FileOpError> {
    let is_link = fs::symlink_metadata(src)
        .map(|m| m.file_type().is_symlink())
        .map_err(|e| FileOpError::from_io("move", src, e))?;
    // A link cannot be created over its placeholder.
    if is_link {
        fs::remove_file(target).map_err(|e| FileOpError::from_io("move", target, e))?;
    }

    copy_recursive(src, target).map_err(|e| {
        cleanup_partial(target);
        FileOpError::from_io("move", src, e)
    })?;
    remove_recursive(src).map_err(|e| FileOpError::from_io("move", src, e))
}

/// Validates a copy or move and returns the source metadata and the preferred target path.
fn prepare_target(
    operation: &'static str,
    src: &Path,
    dest_dir: &Path,
) -> Result<(fs::Metadata, PathBuf), FileOpError> {
    let meta = fs::symlink_metadata(src).map_err(|e| FileOpError::from_io(operation, src, e))?;

    let dest_meta =
        fs::metadata(dest_dir).map_err(|e| FileOpError::from_io(operation, dest_dir, e))?;
    if !dest_meta.is_dir() {
        return Err(FileOpError::conflict(
            operation,
            dest_dir,
            "destination is not a directory",
        ));
    }

    let Some(name) = src.file_name() else {
        return Err(FileOpError::conflict(operation, src, "path has no file name"));
    };

    if is_within(dest_dir, src) {
        return Err(FileOpError::conflict(
            operation,
            src,
            "destination is inside the source",
        ));
    }

    Ok((meta, dest_dir.join(name)))
}

fn cleanup_partial(target: &Path) {
    if fs::symlink_metadata(target).is_ok() {
        let _ = remove_recursive(target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::error;
    use tempfile::tempdir;

    #[test]
    fn copy_into_renames_on_collision() -> Result<(), Box<dyn error::Error>> {
        let dir = tempdir()?;
        let src = dir.path().join("report.txt");
        fs::write(&src, b"v1")?;
        let dest = dir.path().join("out");
        fs::create_dir(&dest)?;
        fs::write(dest.join("report.txt"), b"old")?;

        let written = copy_into(&src, &dest)?;
        assert_eq!(written, dest.join("report_1.txt"));
        assert_eq!(fs::read(dest.join("report.txt"))?, b"old");
        assert_eq!(fs::read(&written)?, b"v1");
        assert!(src.exists());
        Ok(())
    }

    #[test]
    fn copy_into_rejects_own_subtree() -> Result<(), Box<dyn error::Error>> {
        let dir = tempdir()?;
        let src = dir.path().join("tree");
        fs::create_dir_all(src.join("inner"))?;

        let err = copy_into(&src, &src.join("inner")).unwrap_err();
        assert!(matches!(err, FileOpError::Conflict { .. }));
        Ok(())
    }

    #[test]
    fn move_into_relocates_directory() -> Result<(), Box<dyn error::Error>> {
        let dir = tempdir()?;
        let src = dir.path().join("photos");
        fs::create_dir_all(src.join("2024"))?;
        fs::write(src.join("2024/a.jpg"), b"jpg")?;
        let dest = dir.path().join("archive");
        fs::create_dir(&dest)?;

        let moved = move_into(&src, &dest)?;
        assert_eq!(moved, dest.join("photos"));
        assert!(!src.exists());
        assert_eq!(fs::read(moved.join("2024/a.jpg"))?, b"jpg");
        Ok(())
    }

    #[test]
    fn move_into_never_replaces_existing_file() -> Result<(), Box<dyn error::Error>> {
        let dir = tempdir()?;
        let src = dir.path().join("in/report.txt");
        fs::create_dir(dir.path().join("in"))?;
        fs::write(&src, b"moved")?;
        let dest = dir.path().join("out");
        fs::create_dir(&dest)?;
        fs::write(dest.join("report.txt"), b"kept")?;

        let moved = move_into(&src, &dest)?;
        assert_eq!(moved, dest.join("report_1.txt"));
        assert_eq!(fs::read(dest.join("report.txt"))?, b"kept");
        assert_eq!(fs::read(&moved)?, b"moved");
        assert!(!src.exists());
        Ok(())
    }

    #[test]
    fn move_into_same_directory_is_a_conflict() -> Result<(), Box<dyn error::Error>> {
        let dir = tempdir()?;
        let src = dir.path().join("stay.txt");
        fs::write(&src, b"x")?;

        let err = move_into(&src, dir.path()).unwrap_err();
        assert!(matches!(err, FileOpError::Conflict { .. }));
        assert_eq!(fs::read(&src)?, b"x");
        assert_eq!(fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }

    #[test]
    fn move_by_copy_fills_reserved_targets() -> Result<(), Box<dyn error::Error>> {
        let dir = tempdir()?;
        let tree = dir.path().join("tree");
        fs::create_dir_all(tree.join("sub"))?;
        fs::write(tree.join("sub/leaf.txt"), b"leaf")?;
        let file = dir.path().join("note.txt");
        fs::write(&file, b"note")?;

        let out = dir.path().join("out");
        fs::create_dir(&out)?;
        let tree_target = out.join("tree");
        fs::create_dir(&tree_target)?;
        let file_target = out.join("note.txt");
        create_new_file(&file_target)?;

        move_by_copy(&tree, &tree_target)?;
        move_by_copy(&file, &file_target)?;

        assert_eq!(fs::read(tree_target.join("sub/leaf.txt"))?, b"leaf");
        assert_eq!(fs::read(&file_target)?, b"note");
        assert!(!tree.exists());
        assert!(!file.exists());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn move_by_copy_recreates_symlinks() -> Result<(), Box<dyn error::Error>> {
        let dir = tempdir()?;
        let link = dir.path().join("link");
        std::os::unix::fs::symlink("/nowhere", &link)?;
        let target = dir.path().join("moved_link");
        create_new_file(&target)?;

        move_by_copy(&link, &target)?;
        assert_eq!(fs::read_link(&target)?, PathBuf::from("/nowhere"));
        assert!(fs::symlink_metadata(&link).is_err());
        Ok(())
    }

    #[test]
    fn delete_missing_path_is_not_found() {
        let err = delete_path(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, FileOpError::NotFound { .. }));
    }
}
