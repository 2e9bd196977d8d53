use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::error::PlaybackError;
use crate::session::track::Track;

/// Why a play request reached its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEnd {
    /// Played to completion.
    Finished,
    /// Stopped on request (skip or stop).
    Stopped,
    /// The sink gave up mid-play.
    Errored,
}

/// Live controls for a track the sink has accepted. Calls are
/// fire-and-forget; a stop surfaces back to the player loop as the
/// ordinary completion signal.
pub trait PlaybackControls: Send + Sync {
    fn stop(&self);
    fn pause(&self);
    fn resume(&self);
}

/// An accepted play request: the completion signal the player loop awaits,
/// plus the controls command handlers use for skip/pause/resume.
pub struct Playing {
    pub finished: oneshot::Receiver<TrackEnd>,
    pub controls: Arc<dyn PlaybackControls>,
}

/// Voice-output collaborator.
///
/// Contract: every accepted `play` produces exactly one [`TrackEnd`] on
/// `finished` — normal end, requested stop, or error. Dropping the sender
/// without signalling counts as completion too; the player loop treats a
/// closed channel as [`TrackEnd::Errored`] so a misbehaving sink can never
/// wedge the queue.
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn play(&self, track: &Track) -> Result<Playing, PlaybackError>;

    /// Leave the voice channel. Called once, during session teardown.
    async fn disconnect(&self);
}
