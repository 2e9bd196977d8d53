use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{timeout_at, Instant};

use crate::error::SessionError;
use crate::session::track::Track;

/// Outcome of a timed [`TrackQueue::dequeue`].
#[derive(Debug)]
pub enum Dequeued {
    Item(Track),
    /// Nothing arrived within the wait; the caller decides whether to
    /// keep waiting or tear down.
    TimedOut,
    /// The queue was closed while (or before) waiting.
    Closed,
}

#[derive(Debug, Default)]
struct Inner {
    items: VecDeque<Track>,
    closed: bool,
}

/// FIFO of pending tracks shared between command handlers (producers) and
/// one player loop (the sole consumer).
///
/// All mutation happens under a single internal lock, so `snapshot` can
/// never observe a half-applied enqueue or dequeue.
#[derive(Debug, Default)]
pub struct TrackQueue {
    inner: Mutex<Inner>,
    notify: Notify,
}

impl TrackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends to the tail. Never blocks; fails only once the queue has
    /// been closed by teardown.
    pub fn enqueue(&self, track: Track) -> Result<(), SessionError> {
        {
            let mut inner = self.inner.lock();
            if inner.closed {
                return Err(SessionError::QueueClosed);
            }
            inner.items.push_back(track);
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Inserts at the head, so the track is the next one dequeued. Used by
    /// single-track repeat.
    pub fn enqueue_front(&self, track: Track) -> Result<(), SessionError> {
        {
            let mut inner = self.inner.lock();
            if inner.closed {
                return Err(SessionError::QueueClosed);
            }
            inner.items.push_front(track);
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Removes and returns the head, waiting up to `wait` for one to
    /// arrive. A [`Dequeued::TimedOut`] is a distinguished result, not an
    /// error: it is how the player loop learns it has been idle.
    pub async fn dequeue(&self, wait: Duration) -> Dequeued {
        let deadline = Instant::now() + wait;
        loop {
            // Register interest before checking state so a concurrent
            // enqueue between the check and the await still wakes us.
            let notified = self.notify.notified();
            {
                let mut inner = self.inner.lock();
                if let Some(track) = inner.items.pop_front() {
                    return Dequeued::Item(track);
                }
                if inner.closed {
                    return Dequeued::Closed;
                }
            }
            if timeout_at(deadline, notified).await.is_err() {
                return Dequeued::TimedOut;
            }
        }
    }

    /// Pending count, for display. Does not include the current track.
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    /// Ordered copy of all pending tracks, taken under the queue lock.
    pub fn snapshot(&self) -> Vec<Track> {
        self.inner.lock().items.iter().cloned().collect()
    }

    /// Discards all pending tracks, returning how many were dropped.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        let dropped = inner.items.len();
        inner.items.clear();
        dropped
    }

    /// Marks the queue closed and wakes a blocked consumer. Subsequent
    /// enqueues fail with [`SessionError::QueueClosed`]; a pending
    /// `dequeue` returns remaining items first, then [`Dequeued::Closed`].
    pub fn close(&self) {
        self.inner.lock().closed = true;
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}
