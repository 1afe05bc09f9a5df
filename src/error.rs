//! Error types for picsort

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn a directory into an image set.
///
/// Terminal for the folder selection that raised it: no partial image set is built.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to read directory {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure to decode a single image. Recorded on the slot, never fatal.
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    #[error("failed to read {}: {message}", path.display())]
    Io {
        path: PathBuf,
        kind: io::ErrorKind,
        message: String,
    },

    #[error("failed to decode {}: {message}", path.display())]
    Format { path: PathBuf, message: String },

    #[error("decoding {} exceeded {millis}ms", path.display())]
    TimedOut { path: PathBuf, millis: u128 },

    #[error("decode task for {} did not finish: {message}", path.display())]
    Aborted { path: PathBuf, message: String },

    #[error("no image at index {0}")]
    OutOfRange(usize),
}

impl DecodeError {
    /// Whether retrying the same decode could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            DecodeError::Io { kind, .. } => matches!(
                kind,
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

/// Failure to relocate the current image. In-memory state is left untouched.
#[derive(Debug, Error)]
pub enum MoveError {
    #[error("nothing is selected")]
    NothingSelected,

    #[error("folder '{0}' is outside the browsed folder")]
    OutsideRoot(String),

    #[error("destination already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("source does not exist: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("failed to move {} to {}: {source}", from.display(), to.display())]
    Io {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("failed to access config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid key bind '{0}', expected KEY=FOLDER")]
    InvalidBind(String),

    #[error("invalid rebind '{0}', expected OLD=NEW")]
    InvalidRebind(String),
}

/// Crate-level error
#[derive(Debug, Error)]
pub enum PicsortError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Move(#[from] MoveError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, PicsortError>;
