//! Image decoding behind a blocking, fallible interface

use crate::error::DecodeError;
use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Decoded raster held by the cache
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub pixels: RgbaImage,
}

impl DecodedImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Turns a file into raster data. Implementations may block for as long as they need;
/// callers run them on the blocking pool.
pub trait Decoder: Send + Sync + 'static {
    fn decode(&self, path: &Path) -> Result<DecodedImage, DecodeError>;
}

/// Decoder backed by the `image` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageFileDecoder;

impl Decoder for ImageFileDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedImage, DecodeError> {
        let img = image::open(path).map_err(|e| match e {
            image::ImageError::IoError(io) => DecodeError::Io {
                path: path.to_path_buf(),
                kind: io.kind(),
                message: io.to_string(),
            },
            other => DecodeError::Format {
                path: path.to_path_buf(),
                message: other.to_string(),
            },
        })?;

        Ok(DecodedImage::new(img.to_rgba8()))
    }
}

/// Deadline and retry behavior applied around every decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodePolicy {
    /// Give up on a decode after this long; `None` waits indefinitely
    pub deadline: Option<Duration>,
    /// Extra attempts for transient I/O failures
    pub retries: u32,
    pub retry_backoff: Duration,
}

impl Default for DecodePolicy {
    fn default() -> Self {
        Self {
            deadline: None,
            retries: 1,
            retry_backoff: Duration::from_millis(50),
        }
    }
}

/// Runs `decoder` on the blocking pool under `policy`
pub async fn decode_with_policy(
    decoder: Arc<dyn Decoder>,
    path: PathBuf,
    policy: DecodePolicy,
) -> Result<DecodedImage, DecodeError> {
    let mut attempt = 0;
    loop {
        match decode_once(Arc::clone(&decoder), path.clone(), policy.deadline).await {
            Err(e) if e.is_transient() && attempt < policy.retries => {
                attempt += 1;
                warn!(path = %path.display(), attempt, error = %e, "retrying decode");
                tokio::time::sleep(policy.retry_backoff).await;
            }
            result => return result,
        }
    }
}

async fn decode_once(
    decoder: Arc<dyn Decoder>,
    path: PathBuf,
    deadline: Option<Duration>,
) -> Result<DecodedImage, DecodeError> {
    let task_path = path.clone();
    let task = tokio::task::spawn_blocking(move || decoder.decode(&task_path));

    // An expired deadline abandons the blocking thread; it finishes on its own.
    let joined = match deadline {
        Some(limit) => match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined,
            Err(_) => {
                return Err(DecodeError::TimedOut {
                    path,
                    millis: limit.as_millis(),
                })
            }
        },
        None => task.await,
    };

    joined.map_err(|e| DecodeError::Aborted {
        path,
        message: e.to_string(),
    })?
}
