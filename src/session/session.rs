use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::SessionError;
use crate::session::queue::TrackQueue;
use crate::session::repeat::RepeatMode;
use crate::session::sink::{AudioSink, PlaybackControls};
use crate::session::sync::ControllerSync;
use crate::session::track::Track;

/// Player-loop lifecycle. Written only by the loop itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// Blocked on the queue, idle timer running.
    Waiting,
    /// A track is with the audio sink.
    Playing,
    /// Terminal; the session is gone from the registry.
    TornDown,
}

struct CurrentTrack {
    track: Track,
    controls: Arc<dyn PlaybackControls>,
}

/// One guild's playback session.
///
/// Command handlers interact with it only through the narrow surface here
/// (enqueue, skip, stop, pause/resume, repeat mode); the current-track slot
/// and lifecycle state belong to the player loop alone.
pub struct Session {
    guild_id: GuildId,
    /// Text channel status messages go to.
    channel_id: ChannelId,
    queue: TrackQueue,
    current: Mutex<Option<CurrentTrack>>,
    repeat: Mutex<RepeatMode>,
    state: Mutex<PlayerState>,
    paused: AtomicBool,
    cancel: CancellationToken,
    sink: Arc<dyn AudioSink>,
    sync: Arc<dyn ControllerSync>,
}

impl Session {
    pub fn new(
        guild_id: GuildId,
        channel_id: ChannelId,
        sink: Arc<dyn AudioSink>,
        sync: Arc<dyn ControllerSync>,
    ) -> Self {
        Self {
            guild_id,
            channel_id,
            queue: TrackQueue::new(),
            current: Mutex::new(None),
            repeat: Mutex::new(RepeatMode::Off),
            state: Mutex::new(PlayerState::Waiting),
            paused: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            sink,
            sync,
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    /// Appends a track for the player loop to pick up.
    pub fn enqueue(&self, track: Track) -> Result<(), SessionError> {
        self.queue.enqueue(track)?;
        self.refresh();
        Ok(())
    }

    /// Asks the sink to cut the current track short. The sink's completion
    /// signal then drives the ordinary advance, so the loop transitions
    /// exactly once and nothing is double-released.
    pub fn skip(&self) -> Result<(), SessionError> {
        let current = self.current.lock();
        match current.as_ref() {
            Some(current) => {
                current.controls.stop();
                Ok(())
            }
            None => Err(SessionError::NotConnected),
        }
    }

    pub fn pause(&self) -> Result<(), SessionError> {
        {
            let current = self.current.lock();
            let current = current.as_ref().ok_or(SessionError::NotConnected)?;
            current.controls.pause();
            self.paused.store(true, Ordering::SeqCst);
        }
        self.refresh();
        Ok(())
    }

    pub fn resume(&self) -> Result<(), SessionError> {
        {
            let current = self.current.lock();
            let current = current.as_ref().ok_or(SessionError::NotConnected)?;
            current.controls.resume();
            self.paused.store(false, Ordering::SeqCst);
        }
        self.refresh();
        Ok(())
    }

    /// Flips between paused and playing; reports `true` when now paused.
    pub fn toggle_pause(&self) -> Result<bool, SessionError> {
        if self.paused.load(Ordering::SeqCst) {
            self.resume()?;
            Ok(false)
        } else {
            self.pause()?;
            Ok(true)
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Requests teardown: wakes the player loop out of either suspension
    /// point and lets it run the single teardown path.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Sets the repeat mode (or cycles it when `target` is `None`) and
    /// reports the mode now in effect. Never touches the queue or the
    /// current track.
    pub fn set_repeat(&self, target: Option<RepeatMode>) -> RepeatMode {
        let mode = {
            let mut repeat = self.repeat.lock();
            *repeat = target.unwrap_or_else(|| repeat.cycled());
            *repeat
        };
        self.refresh();
        mode
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        *self.repeat.lock()
    }

    pub fn state(&self) -> PlayerState {
        *self.state.lock()
    }

    pub fn current_track(&self) -> Option<Track> {
        self.current.lock().as_ref().map(|c| c.track.clone())
    }

    /// Consistent view of the session for rendering. The queue copy is
    /// taken under the queue lock; the current slot is read afterwards, so
    /// a refresh never shows a discarded track as still current.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            guild_id: self.guild_id,
            channel_id: self.channel_id,
            state: self.state(),
            repeat: self.repeat_mode(),
            paused: self.is_paused(),
            current: self.current_track(),
            upcoming: self.queue.snapshot(),
        }
    }

    pub(crate) fn queue(&self) -> &TrackQueue {
        &self.queue
    }

    pub(crate) fn sink(&self) -> &Arc<dyn AudioSink> {
        &self.sink
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn refresh(&self) {
        self.sync.refresh(&self.snapshot());
    }

    /// Announces a started track to the session's text channel.
    pub(crate) fn announce_started(&self, track: &Track) {
        self.sync.track_started(self.channel_id, track);
    }

    // Player-loop-only mutators.

    pub(crate) fn set_state(&self, state: PlayerState) {
        *self.state.lock() = state;
    }

    pub(crate) fn set_current(&self, track: Track, controls: Arc<dyn PlaybackControls>) {
        self.paused.store(false, Ordering::SeqCst);
        *self.current.lock() = Some(CurrentTrack { track, controls });
    }

    /// Clears the slot, dropping the track and its controls.
    pub(crate) fn clear_current(&self) {
        self.current.lock().take();
    }

    /// Takes the controls out of the slot so teardown can stop an
    /// in-flight track before disconnecting.
    pub(crate) fn take_current_controls(&self) -> Option<Arc<dyn PlaybackControls>> {
        self.current.lock().take().map(|c| c.controls)
    }
}

/// Immutable view handed to the presentation layer.
#[derive(Clone)]
pub struct SessionSnapshot {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub state: PlayerState,
    pub repeat: RepeatMode,
    pub paused: bool,
    pub current: Option<Track>,
    pub upcoming: Vec<Track>,
}

impl SessionSnapshot {
    pub fn queue_len(&self) -> usize {
        self.upcoming.len()
    }

    pub fn total_duration(&self) -> std::time::Duration {
        self.current
            .iter()
            .chain(self.upcoming.iter())
            .filter_map(|t| t.duration())
            .sum()
    }
}
