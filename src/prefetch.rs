//! Background walk that fills the cache in index order

use crate::cache::Claim;
use crate::session::{Generation, Session, SessionId};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Capacity of a session's progress channel
pub const EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefetchState {
    Idle,
    Running,
    Completed,
    /// A newer session started before the walk finished
    Superseded,
}

/// Progress reported to the UI while a session is being prefetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefetchEvent {
    /// `processed` is 1-based and strictly increasing within a session
    Progress {
        session: SessionId,
        processed: usize,
        total: usize,
        name: String,
    },
    /// The walk reached the end; the only point a progress indicator should disappear
    Done { session: SessionId },
}

impl PrefetchEvent {
    pub fn session(&self) -> SessionId {
        match self {
            PrefetchEvent::Progress { session, .. } | PrefetchEvent::Done { session } => *session,
        }
    }
}

/// Walks a session once, front to back, decoding every slot nobody else has claimed.
///
/// Cancellation is cooperative: the walk compares its session id with the live
/// [`Generation`] before each index and before each event, and stops as soon as they differ.
#[derive(Debug)]
pub struct Prefetcher {
    session: Session,
    generation: Generation,
    events: mpsc::Sender<PrefetchEvent>,
    state: Arc<Mutex<PrefetchState>>,
}

impl Prefetcher {
    pub fn new(
        session: Session,
        generation: Generation,
        events: mpsc::Sender<PrefetchEvent>,
    ) -> Self {
        Self {
            session,
            generation,
            events,
            state: Arc::new(Mutex::new(PrefetchState::Idle)),
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session.id()
    }

    pub fn state(&self) -> PrefetchState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts the walk on the current runtime. See [`start_on`](Self::start_on).
    pub fn start(&self) -> Option<JoinHandle<PrefetchState>> {
        self.start_on(&Handle::current())
    }

    /// Starts the walk on `runtime`. Only the first call from `Idle` does anything;
    /// later calls return `None`.
    pub fn start_on(&self, runtime: &Handle) -> Option<JoinHandle<PrefetchState>> {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state != PrefetchState::Idle {
                return None;
            }
            *state = PrefetchState::Running;
        }

        let walk = Walk {
            session: self.session.clone(),
            generation: self.generation.clone(),
            events: self.events.clone(),
            state: Arc::clone(&self.state),
        };
        Some(runtime.spawn(walk.run()))
    }
}

struct Walk {
    session: Session,
    generation: Generation,
    events: mpsc::Sender<PrefetchEvent>,
    state: Arc<Mutex<PrefetchState>>,
}

impl Walk {
    async fn run(self) -> PrefetchState {
        let id = self.session.id();
        let total = self.session.len();
        info!(session = %id, "caching {} image(s)", total);

        for index in 0..total {
            if !self.generation.is_current(id) {
                return self.finish(PrefetchState::Superseded);
            }

            let name = self
                .session
                .images()
                .entry(index)
                .map(|e| e.name)
                .unwrap_or_default();

            match self.session.store().reserve(index) {
                Some(Claim::Acquired(reservation)) => {
                    debug!(session = %id, index, name = %name, "caching image");
                    self.session.fill(reservation).await;
                }
                Some(Claim::Ready(_)) => {
                    debug!(session = %id, index, name = %name, "already cached, skipping");
                }
                Some(Claim::InFlight(_)) => {
                    debug!(session = %id, index, name = %name, "already reserved for loading, skipping");
                }
                Some(Claim::Failed(_)) => {
                    debug!(session = %id, index, name = %name, "already failed, skipping");
                }
                None => {}
            }

            if !self.generation.is_current(id) {
                return self.finish(PrefetchState::Superseded);
            }

            let progress = PrefetchEvent::Progress {
                session: id,
                processed: index + 1,
                total,
                name,
            };
            if self.events.send(progress).await.is_err() {
                // nobody listens to this session any more
                return self.finish(PrefetchState::Superseded);
            }
        }

        if !self.generation.is_current(id) {
            return self.finish(PrefetchState::Superseded);
        }

        let _ = self.events.send(PrefetchEvent::Done { session: id }).await;
        info!(session = %id, "images cached");
        self.finish(PrefetchState::Completed)
    }

    fn finish(&self, state: PrefetchState) -> PrefetchState {
        if state == PrefetchState::Superseded {
            debug!(session = %self.session.id(), "prefetch superseded");
        }
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SlotState;
    use crate::decode::test_decoders::{CountingDecoder, GatedDecoder};
    use crate::decode::{DecodePolicy, Decoder};
    use crate::domain::test_support::write_with_mtime;
    use crate::domain::ImageSet;
    use crate::loader::OnDemandLoader;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        generation: Generation,
        session: Session,
        rx: mpsc::Receiver<PrefetchEvent>,
        prefetcher: Prefetcher,
    }

    fn fixture(files: &[(&str, &[u8])], decoder: Arc<dyn Decoder>) -> Fixture {
        let dir = TempDir::new().unwrap();
        for (i, (name, bytes)) in files.iter().enumerate() {
            write_with_mtime(dir.path(), name, bytes, i as u64 + 1);
        }
        let generation = Generation::new();
        let session = Session::new(
            generation.advance(),
            ImageSet::scan(dir.path()).unwrap(),
            decoder,
            DecodePolicy::default(),
        );
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let prefetcher = Prefetcher::new(session.clone(), generation.clone(), tx);
        Fixture {
            _dir: dir,
            generation,
            session,
            rx,
            prefetcher,
        }
    }

    fn drain(rx: &mut mpsc::Receiver<PrefetchEvent>) -> Vec<PrefetchEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_walk_fills_every_slot_in_order() {
        let decoder = Arc::new(CountingDecoder::default());
        let mut f = fixture(
            &[("a.png", b"a"), ("b.jpg", b"!bad"), ("c.png", b"c")],
            decoder.clone(),
        );

        let handle = f.prefetcher.start().unwrap();
        assert_eq!(handle.await.unwrap(), PrefetchState::Completed);
        assert_eq!(f.prefetcher.state(), PrefetchState::Completed);

        assert!(f.session.store().get(0).unwrap().is_ready());
        assert!(matches!(f.session.store().get(1), Some(SlotState::Failed(_))));
        assert!(f.session.store().get(2).unwrap().is_ready());
        assert_eq!(decoder.total(), 3);

        let events = drain(&mut f.rx);
        let id = f.session.id();
        assert_eq!(
            events,
            vec![
                PrefetchEvent::Progress {
                    session: id,
                    processed: 1,
                    total: 3,
                    name: "a.png".to_string()
                },
                PrefetchEvent::Progress {
                    session: id,
                    processed: 2,
                    total: 3,
                    name: "b.jpg".to_string()
                },
                PrefetchEvent::Progress {
                    session: id,
                    processed: 3,
                    total: 3,
                    name: "c.png".to_string()
                },
                PrefetchEvent::Done { session: id },
            ]
        );
    }

    #[tokio::test]
    async fn test_start_runs_at_most_once() {
        let decoder = Arc::new(CountingDecoder::default());
        let f = fixture(&[("a.png", b"a")], decoder.clone());

        let handle = f.prefetcher.start().unwrap();
        assert!(f.prefetcher.start().is_none());
        handle.await.unwrap();
        assert!(f.prefetcher.start().is_none());
        assert_eq!(decoder.total(), 1);
    }

    #[tokio::test]
    async fn test_walk_skips_ready_slots() {
        let decoder = Arc::new(CountingDecoder::default());
        let mut f = fixture(&[("a.png", b"a"), ("b.png", b"b")], decoder.clone());

        OnDemandLoader::new(f.session.clone())
            .request_image(1)
            .await
            .unwrap();
        f.prefetcher.start().unwrap().await.unwrap();

        assert_eq!(decoder.total(), 2);
        let processed: Vec<usize> = drain(&mut f.rx)
            .into_iter()
            .filter_map(|e| match e {
                PrefetchEvent::Progress { processed, .. } => Some(processed),
                PrefetchEvent::Done { .. } => None,
            })
            .collect();
        assert_eq!(processed, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_empty_session_completes_immediately() {
        let decoder = Arc::new(CountingDecoder::default());
        let mut f = fixture(&[], decoder);

        assert_eq!(
            f.prefetcher.start().unwrap().await.unwrap(),
            PrefetchState::Completed
        );
        assert_eq!(
            drain(&mut f.rx),
            vec![PrefetchEvent::Done {
                session: f.session.id()
            }]
        );
    }

    #[tokio::test]
    async fn test_stale_walk_does_nothing() {
        let decoder = Arc::new(CountingDecoder::default());
        let mut f = fixture(&[("a.png", b"a")], decoder.clone());

        f.generation.advance();
        let state = f.prefetcher.start().unwrap().await.unwrap();

        assert_eq!(state, PrefetchState::Superseded);
        assert_eq!(decoder.total(), 0);
        assert!(drain(&mut f.rx).is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_supersession_during_decode_stops_events() {
        let decoder = Arc::new(GatedDecoder::default());
        let mut f = fixture(
            &[("a.png", b"a"), ("b.png", b"b"), ("c.png", b"c")],
            decoder.clone(),
        );

        let handle = f.prefetcher.start().unwrap();
        while decoder.started() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        // a new folder selection while index 0 is still decoding
        f.generation.advance();
        decoder.open();

        assert_eq!(handle.await.unwrap(), PrefetchState::Superseded);
        assert!(drain(&mut f.rx).is_empty());
        assert_eq!(decoder.started(), 1);
        assert!(matches!(f.session.store().get(1), Some(SlotState::Empty)));
    }

    #[tokio::test]
    async fn test_dropped_receiver_stops_walk() {
        let decoder = Arc::new(CountingDecoder::default());
        let f = fixture(&[("a.png", b"a"), ("b.png", b"b")], decoder.clone());
        drop(f.rx);

        let state = f.prefetcher.start().unwrap().await.unwrap();
        assert_eq!(state, PrefetchState::Superseded);
        assert_eq!(decoder.total(), 1);
    }
}
