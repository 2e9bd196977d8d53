use serenity::model::id::ChannelId;

use crate::session::session::SessionSnapshot;
use crate::session::track::Track;

/// Presentation hook poked after every state change (enqueue, track start,
/// track end, mode change, teardown).
///
/// Implementations must return immediately; the contract is "the display
/// eventually reflects the latest snapshot", so refreshes may be coalesced
/// behind a channel. The player loop is never allowed to wait on
/// presentation I/O.
pub trait ControllerSync: Send + Sync {
    fn refresh(&self, snapshot: &SessionSnapshot);

    /// Fired once per started track, including repeat replays. Unlike
    /// `refresh`, starts are announcements and must not be coalesced.
    fn track_started(&self, channel: ChannelId, track: &Track);
}

/// Sync for sessions without a controller surface.
pub struct NoopSync;

impl ControllerSync for NoopSync {
    fn refresh(&self, _snapshot: &SessionSnapshot) {}

    fn track_started(&self, _channel: ChannelId, _track: &Track) {}
}
