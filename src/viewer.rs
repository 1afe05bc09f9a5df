// Synchronous front for the organizer, polled from the terminal loop

use crate::decode::{DecodedImage, Decoder};
use crate::error::{MoveError, ScanError};
use crate::navigation::{Direction, ImageChanged};
use crate::organizer::{Organizer, OrganizerOptions};
use crate::prefetch::{PrefetchEvent, PrefetchState};
use crate::session::SessionId;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio::sync::oneshot;

/// Load state of the image under the cursor
#[derive(Debug, Clone)]
pub enum ImageState {
    Loading,
    Ready(Arc<DecodedImage>),
    /// Decoding failed; there is nothing to show
    Unavailable,
}

/// What the UI shows for the current cursor position
#[derive(Debug, Clone)]
pub struct CurrentView {
    pub session: SessionId,
    pub index: usize,
    pub total: usize,
    pub name: String,
    pub folder: String,
    pub image: ImageState,
}

/// Prefetch progress, present only while a walk is running
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
    pub name: String,
}

struct PendingLoad {
    session: SessionId,
    index: usize,
    receiver: oneshot::Receiver<Option<Arc<DecodedImage>>>,
}

/// Drives an [`Organizer`] from a synchronous loop without ever waiting on a decode.
///
/// Loads run on the owned runtime; [`poll`](Self::poll) picks up their results and any
/// prefetch progress.
pub struct SyncViewer {
    runtime: Runtime,
    organizer: Organizer,
    current: Option<CurrentView>,
    pending: Option<PendingLoad>,
    progress: Option<Progress>,
}

impl SyncViewer {
    pub fn new(decoder: Arc<dyn Decoder>, options: OrganizerOptions) -> io::Result<Self> {
        let runtime = Runtime::new()?;
        let organizer = Organizer::with_runtime(decoder, options, runtime.handle().clone());

        Ok(Self {
            runtime,
            organizer,
            current: None,
            pending: None,
            progress: None,
        })
    }

    pub fn organizer(&self) -> &Organizer {
        &self.organizer
    }

    pub fn folder(&self) -> Option<&Path> {
        self.organizer.folder()
    }

    pub fn current(&self) -> Option<&CurrentView> {
        self.current.as_ref()
    }

    pub fn progress(&self) -> Option<&Progress> {
        self.progress.as_ref()
    }

    /// Where the image under the cursor currently lives on disk
    pub fn current_path(&self) -> Option<PathBuf> {
        let nav = self.organizer.navigator()?;
        nav.session().images().path_of(nav.cursor()?)
    }

    pub fn caching(&self) -> bool {
        self.organizer.caching()
    }

    pub fn prefetch_state(&self) -> Option<PrefetchState> {
        self.organizer.prefetch_state()
    }

    /// Opens `dir`, replacing the current folder. Returns false if it was already open.
    pub fn select_folder(&mut self, dir: &Path) -> Result<bool, ScanError> {
        if !self.organizer.open_folder(dir)? {
            return Ok(false);
        }
        self.progress = None;
        self.current = None;
        self.pending = None;
        self.show_cursor();
        Ok(true)
    }

    /// Steps the cursor. The image loads in the background; returns false at either end.
    pub fn step(&mut self, direction: Direction) -> bool {
        let moved = self
            .organizer
            .navigator_mut()
            .and_then(|nav| nav.advance(direction))
            .is_some();
        if moved {
            self.show_cursor();
        }
        moved
    }

    /// Moves the current image into `folder`; the displayed image stays as is
    pub fn move_current_to(&mut self, folder: &str) -> Result<bool, MoveError> {
        let nav = self
            .organizer
            .navigator_mut()
            .ok_or(MoveError::NothingSelected)?;
        match nav.move_current_to(folder)? {
            Some(changed) => {
                if let Some(view) = self.current.as_mut() {
                    if view.index == changed.index {
                        view.folder = changed.folder;
                    }
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn set_caching(&mut self, enabled: bool) {
        self.organizer.set_caching(enabled);
    }

    /// Collects finished loads and prefetch progress. Never blocks.
    pub fn poll(&mut self) {
        while let Some(event) = self.organizer.try_next_event() {
            match event {
                PrefetchEvent::Progress {
                    processed,
                    total,
                    name,
                    ..
                } => {
                    self.progress = Some(Progress {
                        processed,
                        total,
                        name,
                    })
                }
                PrefetchEvent::Done { .. } => self.progress = None,
            }
        }

        let Some(pending) = self.pending.as_mut() else {
            return;
        };
        let result = match pending.receiver.try_recv() {
            Ok(image) => image,
            Err(oneshot::error::TryRecvError::Empty) => return,
            Err(oneshot::error::TryRecvError::Closed) => None,
        };
        let (session, index) = (pending.session, pending.index);
        self.pending = None;

        if let Some(view) = self.current.as_mut() {
            if view.session == session && view.index == index {
                view.image = match result {
                    Some(img) => ImageState::Ready(img),
                    None => ImageState::Unavailable,
                };
            }
        }
    }

    /// Rebuilds the view for the cursor, starting a background load if needed
    fn show_cursor(&mut self) {
        let Some(nav) = self.organizer.navigator() else {
            return;
        };
        let Some(index) = nav.cursor() else {
            self.current = None;
            return;
        };
        let session = nav.session().id();

        let cached = nav
            .session()
            .store()
            .get(index)
            .and_then(|slot| slot.image());
        let Some(ImageChanged {
            total,
            name,
            folder,
            image,
            ..
        }) = nav.changed(index, cached)
        else {
            return;
        };

        let image = match image {
            Some(img) => {
                self.pending = None;
                ImageState::Ready(img)
            }
            None => {
                let loader = nav.loader().clone();
                let (tx, rx) = oneshot::channel();
                self.runtime.spawn(async move {
                    let _ = tx.send(loader.request_image(index).await);
                });
                self.pending = Some(PendingLoad {
                    session,
                    index,
                    receiver: rx,
                });
                ImageState::Loading
            }
        };

        self.current = Some(CurrentView {
            session,
            index,
            total,
            name,
            folder,
            image,
        });
    }
}
