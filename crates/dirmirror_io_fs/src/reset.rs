//! Destination reset: recursive removal of a directory tree.

use std::fs;
use std::io;
use std::path::Path;

use crate::spec::{EnumFsOperation, MirrorError};
use crate::util::normalize_path;

/// Delete `path` and everything beneath it.
///
/// A missing `path` is an error (`NotFound`); so is a path that is not a real
/// directory (a plain file or a symlink). Filesystem roots are refused.
pub fn reset_tree<P: AsRef<Path>>(path: P) -> Result<(), MirrorError> {
    let path = path.as_ref();
    let meta_path = fs::symlink_metadata(path)
        .map_err(|e| MirrorError::from_io(EnumFsOperation::Delete, path, e))?;
    if !meta_path.is_dir() {
        return Err(MirrorError::from_io(
            EnumFsOperation::Delete,
            path,
            io::Error::from(io::ErrorKind::NotADirectory),
        ));
    }
    if normalize_path(path).parent().is_none() {
        return Err(MirrorError::UnsafeDestination(format!(
            "Refusing to delete filesystem root: {}",
            path.display()
        )));
    }

    fs::remove_dir_all(path).map_err(|e| MirrorError::from_io(EnumFsOperation::Delete, path, e))?;
    log::info!("Removed {}", path.display());
    Ok(())
}
