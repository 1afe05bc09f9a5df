//! Navigation-driven loads that bypass the prefetch order

use crate::cache::{Claim, SlotOutcome};
use crate::decode::DecodedImage;
use crate::session::Session;
use std::sync::Arc;
use tracing::debug;

/// Loads single images on request, sharing slots with the prefetcher.
///
/// A slot someone else is already decoding is awaited rather than decoded a second time.
#[derive(Debug, Clone)]
pub struct OnDemandLoader {
    session: Session,
}

impl OnDemandLoader {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The image at `index`, decoding it now if nobody has yet.
    ///
    /// `None` for an out-of-range index or a failed decode.
    pub async fn request_image(&self, index: usize) -> Option<Arc<DecodedImage>> {
        self.load(index).await.and_then(|outcome| outcome.image())
    }

    /// Like [`request_image`](Self::request_image) but keeps the failure reason
    pub async fn load(&self, index: usize) -> Option<SlotOutcome> {
        loop {
            match self.session.store().reserve(index)? {
                Claim::Ready(img) => return Some(SlotOutcome::Ready(img)),
                Claim::Failed(e) => return Some(SlotOutcome::Failed(e)),
                Claim::Acquired(reservation) => {
                    debug!(session = %self.session.id(), index, "loading image on demand");
                    return Some(self.session.fill(reservation).await);
                }
                Claim::InFlight(in_flight) => {
                    debug!(session = %self.session.id(), index, "waiting for in-flight load");
                    if let Some(outcome) = in_flight.wait().await {
                        return Some(outcome);
                    }
                    // the other loader gave up; the slot is empty again
                }
            }
        }
    }
}
