//! Cursor over the image set and the move side effect

use crate::decode::DecodedImage;
use crate::domain::keybinds::is_relative_folder;
use crate::domain::{move_file, ImageEntry};
use crate::error::MoveError;
use crate::loader::OnDemandLoader;
use crate::session::Session;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Raised after every successful step or move
#[derive(Debug, Clone)]
pub struct ImageChanged {
    pub index: usize,
    pub total: usize,
    pub name: String,
    pub folder: String,
    /// `None` when the image could not be decoded
    pub image: Option<Arc<DecodedImage>>,
}

/// Owns the cursor for one session.
///
/// The cursor starts before the first image (`None`) and moves one step at a time,
/// stopping at both ends.
#[derive(Debug, Clone)]
pub struct Navigator {
    loader: OnDemandLoader,
    cursor: Option<usize>,
    window: Option<usize>,
}

impl Navigator {
    pub fn new(session: Session) -> Self {
        Self {
            loader: OnDemandLoader::new(session),
            cursor: None,
            window: None,
        }
    }

    /// Keeps only slots within `radius` of the cursor cached
    pub fn with_window(mut self, radius: Option<usize>) -> Self {
        self.window = radius;
        self
    }

    pub fn session(&self) -> &Session {
        self.loader.session()
    }

    pub fn loader(&self) -> &OnDemandLoader {
        &self.loader
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.session().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn current_entry(&self) -> Option<ImageEntry> {
        self.cursor.and_then(|i| self.session().images().entry(i))
    }

    /// Moves the cursor without loading anything. Returns the new index, or `None` at an end.
    pub fn advance(&mut self, direction: Direction) -> Option<usize> {
        let next = match (direction, self.cursor) {
            (Direction::Forward, None) => 0,
            (Direction::Forward, Some(i)) => i + 1,
            (Direction::Backward, Some(i)) if i > 0 => i - 1,
            (Direction::Backward, _) => return None,
        };
        if next >= self.len() {
            return None;
        }

        self.cursor = Some(next);
        debug!(session = %self.session().id(), index = next, "stepped");

        if let Some(radius) = self.window {
            let evicted = self.session().store().retain_window(next, radius);
            if evicted > 0 {
                debug!(evicted, "evicted slots outside window");
            }
        }
        Some(next)
    }

    /// Steps and loads the image under the new cursor
    pub async fn step(&mut self, direction: Direction) -> Option<ImageChanged> {
        let index = self.advance(direction)?;
        let image = self.loader.request_image(index).await;
        self.changed(index, image)
    }

    /// Builds the change event for `index` with the given image
    pub fn changed(&self, index: usize, image: Option<Arc<DecodedImage>>) -> Option<ImageChanged> {
        let entry = self.session().images().entry(index)?;
        Some(ImageChanged {
            index,
            total: self.len(),
            name: entry.name,
            folder: entry.folder,
            image,
        })
    }

    /// Relocates the current image into `folder` (relative to the session root).
    ///
    /// An empty folder is a no-op. The cached raster is kept: only the file's directory
    /// changes, not its contents. On failure nothing in memory changes.
    pub fn move_current_to(&mut self, folder: &str) -> Result<Option<ImageChanged>, MoveError> {
        if folder.is_empty() {
            return Ok(None);
        }
        if !is_relative_folder(folder) {
            return Err(MoveError::OutsideRoot(folder.to_string()));
        }
        let index = self.cursor.ok_or(MoveError::NothingSelected)?;
        let images = self.session().images();
        let entry = images.entry(index).ok_or(MoveError::NothingSelected)?;
        let source = images
            .path_of(index)
            .ok_or(MoveError::NothingSelected)?;
        let destination = images.root().join(folder).join(&entry.name);

        move_file(&source, &destination)?;
        images.set_folder(index, folder);
        info!(name = %entry.name, folder, "moved image");

        let image = self
            .session()
            .store()
            .get(index)
            .and_then(|slot| slot.image());
        Ok(self.changed(index, image))
    }
}
