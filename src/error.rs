use thiserror::Error;

/// Errors returned synchronously to command handlers for user-visible
/// reporting. Resolution and playback failures never show up here; the
/// player loop absorbs those and advances the queue.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// The session is tearing down; the enqueue lost the race.
    #[error("the queue for this server has been closed")]
    QueueClosed,

    /// Skip/stop/pause/repeat with no live session for the guild.
    #[error("nothing is playing in this server")]
    NotConnected,
}

/// The resolver could not turn a query into a playable track.
#[derive(Debug, Error)]
#[error("could not load `{query}`: {reason}")]
pub struct ResolveError {
    pub query: String,
    pub reason: String,
}

impl ResolveError {
    pub fn new(query: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            reason: reason.into(),
        }
    }
}

/// The audio sink rejected or failed a play request.
#[derive(Debug, Error)]
#[error("playback failed: {0}")]
pub struct PlaybackError(pub String);
