//! # Session Module
//!
//! Per-guild playback sessions: the part of the bot that decides what plays
//! next, when, and when to give up.
//!
//! Each guild gets at most one [`Session`], created lazily by the
//! [`SessionRegistry`] on the first enqueue and destroyed when its player
//! loop tears down (explicit stop or idle timeout). A session owns:
//!
//! - a [`TrackQueue`] — the only channel through which command handlers
//!   feed the player loop
//! - the current-track slot, written exclusively by the player loop
//! - a [`RepeatMode`], applied in exactly one place when a track finishes
//!
//! Everything Discord-shaped stays outside: the loop talks to an
//! [`AudioSink`] for actual playback and pokes a [`ControllerSync`] after
//! every state change so the presentation layer can catch up.
//!
//! [`Session`]: session::Session
//! [`SessionRegistry`]: registry::SessionRegistry
//! [`TrackQueue`]: queue::TrackQueue
//! [`RepeatMode`]: repeat::RepeatMode
//! [`AudioSink`]: sink::AudioSink
//! [`ControllerSync`]: sync::ControllerSync

pub mod player;
pub mod queue;
pub mod registry;
pub mod repeat;
pub mod session;
pub mod sink;
pub mod sync;
pub mod track;

#[cfg(test)]
pub(crate) mod testing;

pub use queue::{Dequeued, TrackQueue};
pub use registry::SessionRegistry;
pub use repeat::{on_track_finished, RepeatMode, RequeueDecision};
pub use session::{PlayerState, Session, SessionSnapshot};
pub use sink::{AudioSink, PlaybackControls, Playing, TrackEnd};
pub use sync::ControllerSync;
pub use track::Track;
