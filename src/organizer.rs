//! Folder selection: owns the live session and replaces it wholesale on every selection

use crate::decode::{DecodePolicy, Decoder};
use crate::domain::ImageSet;
use crate::error::ScanError;
use crate::navigation::{Direction, ImageChanged, Navigator};
use crate::prefetch::{PrefetchEvent, PrefetchState, Prefetcher, EVENT_BUFFER};
use crate::session::{Generation, Session, SessionId};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct OrganizerOptions {
    /// Prefetch every image of a folder in the background
    pub caching: bool,
    /// Keep only this many images on each side of the cursor decoded
    pub window: Option<usize>,
    pub policy: DecodePolicy,
}

struct ActiveSession {
    folder: PathBuf,
    navigator: Navigator,
    prefetcher: Prefetcher,
    events: mpsc::Receiver<PrefetchEvent>,
}

pub struct Organizer {
    decoder: Arc<dyn Decoder>,
    options: OrganizerOptions,
    generation: Generation,
    runtime: Handle,
    active: Option<ActiveSession>,
}

impl fmt::Debug for Organizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Organizer")
            .field("options", &self.options)
            .field("generation", &self.generation.current())
            .field("folder", &self.folder())
            .finish()
    }
}

impl Organizer {
    /// Creates an organizer that spawns background work on the current tokio runtime
    pub fn new(decoder: Arc<dyn Decoder>, options: OrganizerOptions) -> Self {
        Self::with_runtime(decoder, options, Handle::current())
    }

    pub fn with_runtime(
        decoder: Arc<dyn Decoder>,
        options: OrganizerOptions,
        runtime: Handle,
    ) -> Self {
        Self {
            decoder,
            options,
            generation: Generation::new(),
            runtime,
            active: None,
        }
    }

    pub fn folder(&self) -> Option<&Path> {
        self.active.as_ref().map(|a| a.folder.as_path())
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.active.as_ref().map(|a| a.navigator.session().id())
    }

    pub fn navigator(&self) -> Option<&Navigator> {
        self.active.as_ref().map(|a| &a.navigator)
    }

    pub fn navigator_mut(&mut self) -> Option<&mut Navigator> {
        self.active.as_mut().map(|a| &mut a.navigator)
    }

    pub fn prefetch_state(&self) -> Option<PrefetchState> {
        self.active.as_ref().map(|a| a.prefetcher.state())
    }

    pub fn caching(&self) -> bool {
        self.options.caching
    }

    /// Replaces the current session with one for `dir` and puts the cursor on the first image.
    ///
    /// Returns `Ok(false)` when `dir` is already the open folder. A scan error leaves the
    /// current session untouched.
    pub fn open_folder(&mut self, dir: &Path) -> Result<bool, ScanError> {
        let folder = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        if self.folder() == Some(folder.as_path()) {
            return Ok(false);
        }

        info!(folder = %folder.display(), "loading image names");
        let images = ImageSet::scan(&folder)?;

        let id = self.generation.advance();
        let session = Session::new(id, images, Arc::clone(&self.decoder), self.options.policy);
        info!(session = %id, count = session.len(), "opened folder");

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let prefetcher = Prefetcher::new(session.clone(), self.generation.clone(), tx);
        if self.options.caching {
            prefetcher.start_on(&self.runtime);
        }

        let mut navigator = Navigator::new(session).with_window(self.options.window);
        navigator.advance(Direction::Forward);

        // drops the previous session's receiver, so a stale walk cannot deliver anything
        self.active = Some(ActiveSession {
            folder,
            navigator,
            prefetcher,
            events: rx,
        });
        Ok(true)
    }

    /// [`open_folder`](Self::open_folder) followed by loading the first image.
    ///
    /// `Ok(None)` when the folder was already open or holds no images.
    pub async fn select_folder(&mut self, dir: &Path) -> Result<Option<ImageChanged>, ScanError> {
        if !self.open_folder(dir)? {
            return Ok(None);
        }
        let Some(navigator) = self.navigator() else {
            return Ok(None);
        };
        let Some(index) = navigator.cursor() else {
            return Ok(None);
        };
        let image = navigator.loader().request_image(index).await;
        Ok(navigator.changed(index, image))
    }

    /// Turns background caching on or off. Switching it on starts the current session's
    /// prefetch if it has not run yet.
    pub fn set_caching(&mut self, enabled: bool) {
        self.options.caching = enabled;
        info!("caching turned {}", if enabled { "on" } else { "off" });
        if !enabled {
            return;
        }
        if let Some(active) = &self.active {
            if active.prefetcher.start_on(&self.runtime).is_none() {
                warn!(state = ?active.prefetcher.state(), "prefetch already started for this folder");
            }
        }
    }

    /// Next pending progress event of the live session, without waiting
    pub fn try_next_event(&mut self) -> Option<PrefetchEvent> {
        self.active.as_mut()?.events.try_recv().ok()
    }

    /// Waits for the next progress event of the live session
    pub async fn next_event(&mut self) -> Option<PrefetchEvent> {
        self.active.as_mut()?.events.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::test_decoders::{CountingDecoder, GatedDecoder};
    use crate::domain::test_support::write_with_mtime;
    use std::time::Duration;
    use tempfile::TempDir;

    fn folder_with(names: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (i, name) in names.iter().enumerate() {
            write_with_mtime(dir.path(), name, name.as_bytes(), i as u64 + 1);
        }
        dir
    }

    fn caching() -> OrganizerOptions {
        OrganizerOptions {
            caching: true,
            ..OrganizerOptions::default()
        }
    }

    #[tokio::test]
    async fn test_end_to_end_browse_and_file() {
        let dir = TempDir::new().unwrap();
        write_with_mtime(dir.path(), "b.jpg", b"b", 2);
        write_with_mtime(dir.path(), "a.png", b"a", 1);

        let mut organizer =
            Organizer::new(Arc::new(CountingDecoder::default()), OrganizerOptions::default());

        let first = organizer.select_folder(dir.path()).await.unwrap().unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(first.name, "a.png");

        let nav = organizer.navigator_mut().unwrap();
        let second = nav.step(Direction::Forward).await.unwrap();
        assert_eq!(second.index, 1);
        assert_eq!(second.name, "b.jpg");

        assert!(nav.step(Direction::Forward).await.is_none());
        assert_eq!(nav.cursor(), Some(1));

        let moved = nav.move_current_to("Keep").unwrap().unwrap();
        assert_eq!(moved.name, "b.jpg");
        assert_eq!(moved.folder, "Keep");
        assert!(dir.path().join("Keep").join("b.jpg").exists());
        assert!(!dir.path().join("b.jpg").exists());
    }

    #[tokio::test]
    async fn test_empty_folder_selects_nothing() {
        let dir = folder_with(&[]);
        let mut organizer =
            Organizer::new(Arc::new(CountingDecoder::default()), OrganizerOptions::default());

        assert!(organizer.select_folder(dir.path()).await.unwrap().is_none());
        assert_eq!(organizer.navigator().unwrap().cursor(), None);
    }

    #[tokio::test]
    async fn test_scan_error_keeps_previous_session() {
        let dir = folder_with(&["a.png"]);
        let mut organizer =
            Organizer::new(Arc::new(CountingDecoder::default()), OrganizerOptions::default());
        organizer.select_folder(dir.path()).await.unwrap();
        let id = organizer.session_id();

        let result = organizer
            .select_folder(&dir.path().join("a.png"))
            .await;

        assert!(matches!(result, Err(ScanError::NotADirectory(_))));
        assert_eq!(organizer.session_id(), id);
        assert_eq!(organizer.navigator().unwrap().cursor(), Some(0));
    }

    #[tokio::test]
    async fn test_reselecting_same_folder_is_no_op() {
        let dir = folder_with(&["a.png", "b.png"]);
        let mut organizer =
            Organizer::new(Arc::new(CountingDecoder::default()), OrganizerOptions::default());
        organizer.select_folder(dir.path()).await.unwrap();
        organizer.navigator_mut().unwrap().advance(Direction::Forward);
        let id = organizer.session_id();

        assert!(!organizer.open_folder(dir.path()).unwrap());
        assert_eq!(organizer.session_id(), id);
        assert_eq!(organizer.navigator().unwrap().cursor(), Some(1));
    }

    #[tokio::test]
    async fn test_caching_reports_progress_then_done() {
        let dir = folder_with(&["a.png", "b.png"]);
        let mut organizer = Organizer::new(Arc::new(CountingDecoder::default()), caching());
        organizer.open_folder(dir.path()).unwrap();
        let id = organizer.session_id().unwrap();

        let mut processed = Vec::new();
        loop {
            match organizer.next_event().await.unwrap() {
                PrefetchEvent::Progress { processed: n, .. } => processed.push(n),
                PrefetchEvent::Done { session } => {
                    assert_eq!(session, id);
                    break;
                }
            }
        }
        assert_eq!(processed, vec![1, 2]);

        let nav = organizer.navigator().unwrap();
        assert_eq!(nav.session().store().ready_count(), 2);
    }

    #[tokio::test]
    async fn test_enabling_caching_starts_prefetch_once() {
        let dir = folder_with(&["a.png"]);
        let decoder = Arc::new(CountingDecoder::default());
        let mut organizer = Organizer::new(decoder.clone(), OrganizerOptions::default());
        organizer.open_folder(dir.path()).unwrap();
        assert_eq!(organizer.prefetch_state(), Some(PrefetchState::Idle));

        organizer.set_caching(true);
        while !matches!(organizer.next_event().await, Some(PrefetchEvent::Done { .. })) {}
        assert_eq!(organizer.prefetch_state(), Some(PrefetchState::Completed));

        organizer.set_caching(false);
        organizer.set_caching(true);
        assert_eq!(organizer.prefetch_state(), Some(PrefetchState::Completed));
        assert_eq!(decoder.total(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_new_folder_silences_previous_prefetch() {
        let first = folder_with(&["a.png", "b.png", "c.png"]);
        let second = folder_with(&["x.png"]);
        let decoder = Arc::new(GatedDecoder::default());
        let mut organizer = Organizer::new(decoder.clone(), caching());

        organizer.open_folder(first.path()).unwrap();
        let stale = organizer.session_id().unwrap();
        while decoder.started() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        organizer.open_folder(second.path()).unwrap();
        let live = organizer.session_id().unwrap();
        decoder.open();

        let mut events = Vec::new();
        loop {
            let event = tokio::time::timeout(Duration::from_secs(5), organizer.next_event())
                .await
                .unwrap()
                .unwrap();
            let done = matches!(event, PrefetchEvent::Done { .. });
            events.push(event);
            if done {
                break;
            }
        }

        assert_ne!(stale, live);
        assert!(events.iter().all(|e| e.session() == live));
        // give the stale walk time to observe supersession
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(organizer.try_next_event().is_none());
    }
}
