//! Session identity and the per-session bundle of image set, cache and decoder

use crate::cache::{CacheStore, Reservation, SlotOutcome};
use crate::decode::{decode_with_policy, DecodePolicy, DecodedImage, Decoder};
use crate::domain::ImageSet;
use crate::error::DecodeError;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Identifies one folder selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The live session counter. Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new session, invalidating every earlier id
    pub fn advance(&self) -> SessionId {
        SessionId(self.0.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn current(&self) -> SessionId {
        SessionId(self.0.load(Ordering::Acquire))
    }

    pub fn is_current(&self, id: SessionId) -> bool {
        self.current() == id
    }
}

struct SessionInner {
    id: SessionId,
    images: Arc<ImageSet>,
    store: Arc<CacheStore>,
    decoder: Arc<dyn Decoder>,
    policy: DecodePolicy,
}

/// Everything that lives exactly as long as one folder selection
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("root", &self.inner.images.root())
            .field("len", &self.inner.store.len())
            .finish()
    }
}

impl Session {
    pub fn new(
        id: SessionId,
        images: ImageSet,
        decoder: Arc<dyn Decoder>,
        policy: DecodePolicy,
    ) -> Self {
        let store = Arc::new(CacheStore::new(images.len()));
        Self {
            inner: Arc::new(SessionInner {
                id,
                images: Arc::new(images),
                store,
                decoder,
                policy,
            }),
        }
    }

    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    pub fn images(&self) -> &Arc<ImageSet> {
        &self.inner.images
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.inner.store
    }

    pub fn len(&self) -> usize {
        self.inner.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decodes the image behind `reservation` and stores the result in its slot.
    ///
    /// A move can land while the decode is running. When a decode fails and the image has
    /// since changed location, it is decoded again from the new path.
    pub(crate) async fn fill(&self, reservation: Reservation) -> SlotOutcome {
        let index = reservation.index();
        let mut path = self.inner.images.path_of(index);
        let mut result = self.decode_at(index, path.clone()).await;

        while result.is_err() {
            let current = self.inner.images.path_of(index);
            if current == path {
                break;
            }
            debug!(session = %self.inner.id, index, "image moved during decode, retrying");
            path = current;
            result = self.decode_at(index, path.clone()).await;
        }

        if let Err(e) = &result {
            warn!(session = %self.inner.id, index, error = %e, "failed to decode image");
        }

        reservation.put(result)
    }

    async fn decode_at(
        &self,
        index: usize,
        path: Option<PathBuf>,
    ) -> Result<DecodedImage, DecodeError> {
        match path {
            Some(path) => {
                decode_with_policy(Arc::clone(&self.inner.decoder), path, self.inner.policy).await
            }
            None => Err(DecodeError::OutOfRange(index)),
        }
    }
}
