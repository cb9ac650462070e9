use crate::shipper::window::{Clock, Delayed};
use std::cmp::Ordering;
use std::collections::binary_heap::PeekMut;
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Longest single sleep in `take`; the head is re-checked after each one
const MAX_PARK_MS: i64 = 60_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("wait on queue was interrupted")]
    Interrupted,
}

/// Min-heap of delayed items guarded by a mutex, with a [`Notify`] to wake
/// the consumer when something new arrives.
///
/// Producers never block beyond the heap insert. Only one task is expected
/// to call [`take`](Self::take) at a time; the force-drain methods
/// ([`force_pop`](Self::force_pop), [`peek`](Self::peek),
/// [`remove`](Self::remove)) ignore delays entirely and must not run while
/// that task is still alive.
pub struct DelayQueue<T> {
    inner: Mutex<Inner<T>>,
    available: Notify,
    clock: Arc<dyn Clock>,
}

struct Inner<T> {
    heap: BinaryHeap<Entry<T>>,
    next_seq: u64,
}

struct Entry<T> {
    expires_at_ms: i64,
    seq: u64,
    item: T,
}

// Reversed so the std max-heap pops the earliest expiry first. The sequence
// number only keeps the ordering total; equal expiries have no promised order.
impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .expires_at_ms
            .cmp(&self.expires_at_ms)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Entry<T> {}

impl<T: Delayed> DelayQueue<T> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                heap: BinaryHeap::new(),
                next_seq: 0,
            }),
            available: Notify::new(),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        // A panic while holding the lock cannot leave the heap half-updated
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert an item; never waits on the consumer
    pub fn add(&self, item: T) {
        {
            let mut inner = self.lock();
            let seq = inner.next_seq;
            inner.next_seq += 1;
            inner.heap.push(Entry {
                expires_at_ms: item.expires_at_ms(),
                seq,
                item,
            });
        }
        self.available.notify_one();
    }

    /// Wait for the earliest item's window to close and return it.
    ///
    /// Returns [`QueueError::Interrupted`] as soon as `cancel` fires, and
    /// before handing out any item if it had already fired.
    pub async fn take(&self, cancel: &CancellationToken) -> Result<T, QueueError> {
        loop {
            if cancel.is_cancelled() {
                return Err(QueueError::Interrupted);
            }

            let notified = self.available.notified();

            let wait = {
                let mut inner = self.lock();
                let now = self.clock.now_ms();
                let wait = match inner.heap.peek_mut() {
                    Some(head) if head.expires_at_ms <= now => {
                        return Ok(PeekMut::pop(head).item);
                    }
                    Some(head) => {
                        let remaining = (head.expires_at_ms - now).min(MAX_PARK_MS);
                        Some(Duration::from_millis(remaining as u64))
                    }
                    None => None,
                };
                wait
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(QueueError::Interrupted),
                _ = notified => {}
                _ = sleep_for(wait) => {}
            }
        }
    }

    /// Move every item whose window has closed into `out` without waiting.
    /// Returns how many were moved.
    pub fn drain_available(&self, out: &mut Vec<T>) -> usize {
        let mut inner = self.lock();
        let now = self.clock.now_ms();
        let mut moved = 0;

        while let Some(head) = inner.heap.peek_mut() {
            if head.expires_at_ms > now {
                break;
            }
            out.push(PeekMut::pop(head).item);
            moved += 1;
        }

        moved
    }

    /// Remove the earliest item regardless of its remaining delay
    pub fn force_pop(&self) -> Option<T> {
        self.lock().heap.pop().map(|entry| entry.item)
    }

    pub fn len(&self) -> usize {
        self.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().heap.is_empty()
    }
}

impl<T: Delayed + Clone> DelayQueue<T> {
    /// Copy of the earliest item, ignoring its delay
    pub fn peek(&self) -> Option<T> {
        self.lock().heap.peek().map(|entry| entry.item.clone())
    }
}

impl<T: Delayed + PartialEq> DelayQueue<T> {
    /// Remove one item equal to `item` regardless of its remaining delay
    pub fn remove(&self, item: &T) -> bool {
        let mut inner = self.lock();
        let mut entries = std::mem::take(&mut inner.heap).into_vec();
        let found = match entries.iter().position(|entry| &entry.item == item) {
            Some(pos) => {
                entries.swap_remove(pos);
                true
            }
            None => false,
        };
        inner.heap = BinaryHeap::from(entries);
        found
    }
}

async fn sleep_for(wait: Option<Duration>) {
    match wait {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending::<()>().await,
    }
}
