//! Per-index slot store shared by the prefetcher and on-demand loads

use crate::decode::DecodedImage;
use crate::error::DecodeError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// Observable state of one slot
#[derive(Debug, Clone)]
pub enum SlotState {
    Empty,
    /// A loader holds the reservation and is decoding
    Reserved,
    Ready(Arc<DecodedImage>),
    Failed(DecodeError),
}

impl SlotState {
    pub fn is_ready(&self) -> bool {
        matches!(self, SlotState::Ready(_))
    }

    pub fn image(&self) -> Option<Arc<DecodedImage>> {
        match self {
            SlotState::Ready(img) => Some(Arc::clone(img)),
            _ => None,
        }
    }
}

/// Final result of a load, as published to waiters
#[derive(Debug, Clone)]
pub enum SlotOutcome {
    Ready(Arc<DecodedImage>),
    Failed(DecodeError),
}

impl SlotOutcome {
    pub fn image(&self) -> Option<Arc<DecodedImage>> {
        match self {
            SlotOutcome::Ready(img) => Some(Arc::clone(img)),
            SlotOutcome::Failed(_) => None,
        }
    }
}

type Completion = Option<SlotOutcome>;

#[derive(Debug)]
enum Slot {
    Empty,
    Reserved {
        ticket: u64,
        done: watch::Receiver<Completion>,
    },
    Ready(Arc<DecodedImage>),
    Failed(DecodeError),
}

/// Result of [`CacheStore::reserve`]
#[derive(Debug)]
pub enum Claim {
    /// The slot was empty and now belongs to the caller
    Acquired(Reservation),
    /// Another loader holds the slot
    InFlight(InFlight),
    Ready(Arc<DecodedImage>),
    Failed(DecodeError),
}

/// Slot store for one session. The length is fixed at creation.
#[derive(Debug)]
pub struct CacheStore {
    slots: Vec<Mutex<Slot>>,
    next_ticket: AtomicU64,
}

impl CacheStore {
    pub fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| Mutex::new(Slot::Empty)).collect(),
            next_ticket: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Current state of a slot; `None` when `index` is out of range. Never waits on a decode.
    pub fn get(&self, index: usize) -> Option<SlotState> {
        let slot = self.lock(index)?;
        Some(match &*slot {
            Slot::Empty => SlotState::Empty,
            Slot::Reserved { .. } => SlotState::Reserved,
            Slot::Ready(img) => SlotState::Ready(Arc::clone(img)),
            Slot::Failed(e) => SlotState::Failed(e.clone()),
        })
    }

    /// Atomically moves an empty slot to reserved.
    ///
    /// Any other state is left as is and reported back, so reserving twice is harmless.
    pub fn reserve(self: &Arc<Self>, index: usize) -> Option<Claim> {
        let mut slot = self.lock(index)?;
        if matches!(*slot, Slot::Empty) {
            let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
            let (tx, rx) = watch::channel(None);
            *slot = Slot::Reserved { ticket, done: rx };
            return Some(Claim::Acquired(Reservation {
                store: Arc::clone(self),
                index,
                ticket,
                done: Some(tx),
            }));
        }

        let claim = match &*slot {
            Slot::Empty => unreachable!("empty slots are claimed above"),
            Slot::Reserved { done, .. } => Claim::InFlight(InFlight {
                index,
                done: done.clone(),
            }),
            Slot::Ready(img) => Claim::Ready(Arc::clone(img)),
            Slot::Failed(e) => Claim::Failed(e.clone()),
        };
        Some(claim)
    }

    /// Drops finished slots farther than `radius` from `center`. Reserved slots are kept.
    ///
    /// Returns how many slots were emptied.
    pub fn retain_window(&self, center: usize, radius: usize) -> usize {
        let mut evicted = 0;
        for (index, slot) in self.slots.iter().enumerate() {
            if index.abs_diff(center) <= radius {
                continue;
            }
            let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
            if matches!(*slot, Slot::Ready(_) | Slot::Failed(_)) {
                *slot = Slot::Empty;
                evicted += 1;
            }
        }
        evicted
    }

    pub fn ready_count(&self) -> usize {
        (0..self.len())
            .filter(|&i| matches!(self.get(i), Some(SlotState::Ready(_))))
            .count()
    }

    fn lock(&self, index: usize) -> Option<MutexGuard<'_, Slot>> {
        self.slots
            .get(index)
            .map(|m| m.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Exclusive right to fill one slot.
///
/// Consumed by [`Reservation::put`]. Dropping it unfilled returns the slot to empty and
/// wakes any waiter so it can try again.
#[derive(Debug)]
pub struct Reservation {
    store: Arc<CacheStore>,
    index: usize,
    ticket: u64,
    done: Option<watch::Sender<Completion>>,
}

impl Reservation {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Stores the decode result and wakes everyone waiting on this slot
    pub fn put(mut self, result: Result<DecodedImage, DecodeError>) -> SlotOutcome {
        let outcome = match result {
            Ok(img) => SlotOutcome::Ready(Arc::new(img)),
            Err(e) => SlotOutcome::Failed(e),
        };

        if let Some(mut slot) = self.store.lock(self.index) {
            if matches!(&*slot, Slot::Reserved { ticket, .. } if *ticket == self.ticket) {
                *slot = match &outcome {
                    SlotOutcome::Ready(img) => Slot::Ready(Arc::clone(img)),
                    SlotOutcome::Failed(e) => Slot::Failed(e.clone()),
                };
            }
        }

        if let Some(done) = self.done.take() {
            done.send_replace(Some(outcome.clone()));
        }
        outcome
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.done.is_none() {
            return;
        }
        if let Some(mut slot) = self.store.lock(self.index) {
            if matches!(&*slot, Slot::Reserved { ticket, .. } if *ticket == self.ticket) {
                *slot = Slot::Empty;
            }
        }
        // dropping the sender closes the channel for waiters
        self.done = None;
    }
}

/// Handle on a load someone else is performing
#[derive(Debug)]
pub struct InFlight {
    index: usize,
    done: watch::Receiver<Completion>,
}

impl InFlight {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Waits for the in-flight load. `None` means it was abandoned and the slot is empty again.
    pub async fn wait(mut self) -> Option<SlotOutcome> {
        let outcome = match self.done.wait_for(|c| c.is_some()).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        };
        outcome
    }
}
