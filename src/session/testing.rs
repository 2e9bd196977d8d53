//! Hand-rolled doubles for the sink and sync collaborators, driven
//! directly by the tests: each play hands back its controls through a
//! channel, and completion fires only when the test says so.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;

use serenity::model::id::ChannelId;

use crate::error::PlaybackError;
use crate::session::session::SessionSnapshot;
use crate::session::sink::{AudioSink, PlaybackControls, Playing, TrackEnd};
use crate::session::sync::ControllerSync;
use crate::session::track::Track;

/// Emitted to the test whenever the sink accepts a play request.
pub(crate) struct StartedPlay {
    pub track: Track,
    pub controls: Arc<MockControls>,
}

pub(crate) struct MockSink {
    starts: UnboundedSender<StartedPlay>,
    plays: AtomicUsize,
    fail_next: AtomicBool,
    disconnected: AtomicBool,
}

impl MockSink {
    pub fn new() -> (Arc<Self>, UnboundedReceiver<StartedPlay>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Arc::new(Self {
            starts: tx,
            plays: AtomicUsize::new(0),
            fail_next: AtomicBool::new(false),
            disconnected: AtomicBool::new(false),
        });
        (sink, rx)
    }

    /// The next play request is rejected, as if the stream were dead.
    pub fn fail_next_play(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn play_count(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    pub fn disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioSink for MockSink {
    async fn play(&self, track: &Track) -> Result<Playing, PlaybackError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(PlaybackError("stream refused".into()));
        }

        let (tx, rx) = oneshot::channel();
        let controls = Arc::new(MockControls {
            finished: Mutex::new(Some(tx)),
            stops: AtomicUsize::new(0),
            pauses: AtomicUsize::new(0),
            resumes: AtomicUsize::new(0),
        });

        self.plays.fetch_add(1, Ordering::SeqCst);
        // The receiver may be gone when a test doesn't care about starts.
        let _ = self.starts.send(StartedPlay {
            track: track.clone(),
            controls: controls.clone(),
        });

        Ok(Playing {
            finished: rx,
            controls,
        })
    }

    async fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }
}

pub(crate) struct MockControls {
    finished: Mutex<Option<oneshot::Sender<TrackEnd>>>,
    stops: AtomicUsize,
    pauses: AtomicUsize,
    resumes: AtomicUsize,
}

impl MockControls {
    /// Normal end of track.
    pub fn finish(&self) {
        if let Some(tx) = self.finished.lock().take() {
            let _ = tx.send(TrackEnd::Finished);
        }
    }

    /// Simulates a sink that forgets to signal: the sender just vanishes.
    pub fn drop_sender(&self) {
        self.finished.lock().take();
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    #[allow(dead_code)]
    pub fn pause_count(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    #[allow(dead_code)]
    pub fn resume_count(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }
}

impl PlaybackControls for MockControls {
    // Mirrors the songbird contract: stopping a track still produces its
    // one completion event.
    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if let Some(tx) = self.finished.lock().take() {
            let _ = tx.send(TrackEnd::Stopped);
        }
    }

    fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.resumes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Records refreshes and track-start announcements so tests can assert the
/// sync was poked and what it was told.
#[derive(Default)]
pub(crate) struct CountingSync {
    refreshes: AtomicUsize,
    last: Mutex<Option<SessionSnapshot>>,
    announcements: Mutex<Vec<(ChannelId, Track)>>,
}

impl CountingSync {
    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn last_snapshot(&self) -> Option<SessionSnapshot> {
        self.last.lock().clone()
    }

    pub fn announcements(&self) -> Vec<(ChannelId, Track)> {
        self.announcements.lock().clone()
    }
}

impl ControllerSync for CountingSync {
    fn refresh(&self, snapshot: &SessionSnapshot) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        *self.last.lock() = Some(snapshot.clone());
    }

    fn track_started(&self, channel: ChannelId, track: &Track) {
        self.announcements.lock().push((channel, track.clone()));
    }
}
