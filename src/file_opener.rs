// Hands the current image to the system's default viewer

use std::io;
use std::path::Path;
use tracing::debug;

/// Opens `path` with the default application without waiting for it to exit
pub fn open_file(path: &Path) -> io::Result<()> {
    if !path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        ));
    }
    debug!(path = %path.display(), "opening in system viewer");
    open::that_detached(path)
}
