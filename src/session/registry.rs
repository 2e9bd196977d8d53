use dashmap::DashMap;
use serenity::model::id::GuildId;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::SessionError;
use crate::session::player;
use crate::session::repeat::RepeatMode;
use crate::session::session::{Session, SessionSnapshot};

/// Process-wide map of live sessions, one per guild.
///
/// Creation is atomic: the DashMap entry holds its shard lock while the
/// factory runs, so two concurrent play commands for the same guild get
/// the same session and exactly one player loop.
pub struct SessionRegistry {
    sessions: DashMap<GuildId, Arc<Session>>,
    idle_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(idle_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            sessions: DashMap::new(),
            idle_timeout,
        })
    }

    /// Returns the live session for `guild_id`, or builds one via
    /// `factory` and starts its player loop.
    pub fn get_or_create<F>(self: &Arc<Self>, guild_id: GuildId, factory: F) -> Arc<Session>
    where
        F: FnOnce() -> Session,
    {
        self.sessions
            .entry(guild_id)
            .or_insert_with(|| {
                let session = Arc::new(factory());
                debug!(%guild_id, "creating session");
                player::spawn(session.clone(), self.clone(), self.idle_timeout);
                session
            })
            .clone()
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<Session>> {
        self.sessions.get(&guild_id).map(|s| s.clone())
    }

    /// Idempotent; called by the player loop's own teardown (and harmless
    /// if the entry is already gone).
    pub fn remove(&self, guild_id: GuildId) {
        if self.sessions.remove(&guild_id).is_some() {
            debug!(%guild_id, "session removed");
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    // The command surface: every mutating entry point external callers get.

    pub fn skip(&self, guild_id: GuildId) -> Result<(), SessionError> {
        self.get(guild_id).ok_or(SessionError::NotConnected)?.skip()
    }

    pub fn stop(&self, guild_id: GuildId) -> Result<(), SessionError> {
        let session = self.get(guild_id).ok_or(SessionError::NotConnected)?;
        session.stop();
        Ok(())
    }

    pub fn pause(&self, guild_id: GuildId) -> Result<(), SessionError> {
        self.get(guild_id).ok_or(SessionError::NotConnected)?.pause()
    }

    pub fn resume(&self, guild_id: GuildId) -> Result<(), SessionError> {
        self.get(guild_id).ok_or(SessionError::NotConnected)?.resume()
    }

    pub fn set_repeat(
        &self,
        guild_id: GuildId,
        target: Option<RepeatMode>,
    ) -> Result<RepeatMode, SessionError> {
        Ok(self
            .get(guild_id)
            .ok_or(SessionError::NotConnected)?
            .set_repeat(target))
    }

    pub fn snapshot(&self, guild_id: GuildId) -> Option<SessionSnapshot> {
        self.get(guild_id).map(|s| s.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::sync::NoopSync;
    use crate::session::testing::MockSink;
    use pretty_assertions::assert_eq;
    use serenity::model::id::ChannelId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const GUILD: GuildId = GuildId::new(77);

    fn new_session(sink: Arc<MockSink>) -> Session {
        Session::new(GUILD, ChannelId::new(1), sink, Arc::new(NoopSync))
    }

    #[tokio::test]
    async fn concurrent_get_or_create_builds_one_session() {
        let registry = SessionRegistry::new(Duration::from_secs(300));
        let built = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            let built = built.clone();
            handles.push(tokio::spawn(async move {
                registry.get_or_create(GUILD, || {
                    built.fetch_add(1, Ordering::SeqCst);
                    let (sink, _rx) = MockSink::new();
                    new_session(sink)
                })
            }));
        }

        let sessions: Vec<_> = futures_join(handles).await;
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
        for pair in sessions.windows(2) {
            assert!(Arc::ptr_eq(&pair[0], &pair[1]));
        }
    }

    async fn futures_join(
        handles: Vec<tokio::task::JoinHandle<Arc<Session>>>,
    ) -> Vec<Arc<Session>> {
        let mut out = Vec::with_capacity(handles.len());
        for handle in handles {
            out.push(handle.await.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn skip_and_stop_without_a_session_report_not_connected() {
        let registry = SessionRegistry::new(Duration::from_secs(300));
        assert_eq!(registry.skip(GUILD), Err(SessionError::NotConnected));
        assert_eq!(registry.stop(GUILD), Err(SessionError::NotConnected));
        assert_eq!(registry.pause(GUILD), Err(SessionError::NotConnected));
        assert_eq!(
            registry.set_repeat(GUILD, None),
            Err(SessionError::NotConnected)
        );
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let registry = SessionRegistry::new(Duration::from_secs(300));
        registry.remove(GUILD);
        registry.remove(GUILD);
        assert!(registry.is_empty());
    }
}
