use crate::error::MoveError;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Moves a file, creating the destination directory tree when needed.
///
/// Never overwrites: an existing destination is reported as [`MoveError::AlreadyExists`]
/// and nothing is touched.
pub fn move_file(source: &Path, destination: &Path) -> Result<(), MoveError> {
    if !source.is_file() {
        return Err(MoveError::MissingSource(source.to_path_buf()));
    }

    if destination.exists() {
        return Err(MoveError::AlreadyExists(destination.to_path_buf()));
    }

    let io_err = |source_err| MoveError::Io {
        from: source.to_path_buf(),
        to: destination.to_path_buf(),
        source: source_err,
    };

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    fs::rename(source, destination).map_err(io_err)?;

    debug!(from = %source.display(), to = %destination.display(), "moved file");
    Ok(())
}
