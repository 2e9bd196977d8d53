use async_trait::async_trait;
use serenity::model::id::UserId;

use crate::error::ResolveError;
use crate::session::Track;

pub mod ytdlp;

pub use ytdlp::YtDlpResolver;

/// Search/extraction collaborator: turns a user query (URL or free text)
/// into a playable [`Track`].
///
/// Resolution is network-bound and slow; it always runs on the command
/// handler's task, never inside a player loop, so one guild's search can
/// never stall another guild's playback.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, query: &str, requested_by: UserId) -> Result<Track, ResolveError>;
}
