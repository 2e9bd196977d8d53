use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::session::queue::Dequeued;
use crate::session::registry::SessionRegistry;
use crate::session::repeat::{on_track_finished, RequeueDecision};
use crate::session::session::{PlayerState, Session};
use crate::session::sink::TrackEnd;
use crate::session::track::Track;

/// Starts the player loop for a freshly created session. Exactly one loop
/// runs per session; it is the sole consumer of the session's queue and
/// the only writer of its current-track slot and lifecycle state.
pub(crate) fn spawn(
    session: Arc<Session>,
    registry: Arc<SessionRegistry>,
    idle_timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(run(session, registry, idle_timeout))
}

async fn run(session: Arc<Session>, registry: Arc<SessionRegistry>, idle_timeout: Duration) {
    let guild_id = session.guild_id();
    debug!(%guild_id, "player loop started");

    loop {
        session.set_state(PlayerState::Waiting);

        // Waiting: blocked on the queue with the idle timer running. Any
        // successful dequeue resets the timer on the next pass. A stop
        // request wakes this wait immediately.
        let polled = tokio::select! {
            _ = session.cancel_token().cancelled() => break,
            polled = session.queue().dequeue(idle_timeout) => polled,
        };

        let track = match polled {
            Dequeued::Item(track) => track,
            Dequeued::TimedOut => {
                info!(%guild_id, idle_secs = idle_timeout.as_secs(), "queue idle, tearing down");
                break;
            }
            Dequeued::Closed => break,
        };

        play_one(&session, track).await;

        if session.cancel_token().is_cancelled() {
            break;
        }
    }

    teardown(&session, &registry).await;
}

/// Playing: hand the track to the sink, wait for its single completion
/// signal, then apply the repeat decision. Start failures advance the
/// queue exactly like a completed track; a wedged track must never block
/// the rest of the queue.
async fn play_one(session: &Arc<Session>, track: Track) {
    let guild_id = session.guild_id();
    session.set_state(PlayerState::Playing);

    let playing = match session.sink().play(&track).await {
        Ok(playing) => playing,
        Err(err) => {
            warn!(%guild_id, title = track.title(), %err, "track failed to start, skipping");
            session.refresh();
            return;
        }
    };

    info!(%guild_id, title = track.title(), "now playing");
    session.set_current(track.clone(), playing.controls.clone());
    session.announce_started(&track);
    session.refresh();

    let end = tokio::select! {
        // Stop bypasses the transition table: cut the sink and leave; the
        // in-flight completion has nowhere to land once we return.
        _ = session.cancel_token().cancelled() => {
            playing.controls.stop();
            return;
        }
        // A dropped sender counts as completion (see the AudioSink
        // contract); the loop must not rely on a second signal.
        end = playing.finished => end.unwrap_or(TrackEnd::Errored),
    };

    if end == TrackEnd::Errored {
        warn!(%guild_id, title = track.title(), "track ended with an error, advancing");
    } else {
        debug!(%guild_id, title = track.title(), ?end, "track ended");
    }

    session.clear_current();

    // The single call site for repeat handling.
    match on_track_finished(session.repeat_mode(), track) {
        RequeueDecision::Discard => {}
        RequeueDecision::Front(track) => {
            let _ = session.queue().enqueue_front(track);
        }
        RequeueDecision::Back(track) => {
            let _ = session.queue().enqueue(track);
        }
    }

    session.refresh();
}

/// The one teardown path, run by the loop itself on idle timeout, stop, or
/// queue closure. Order matters: silence the sink, then drop pending
/// state, then release the registry entry.
async fn teardown(session: &Arc<Session>, registry: &Arc<SessionRegistry>) {
    let guild_id = session.guild_id();

    // Make the stop observable to late enqueuers even on the idle path.
    session.cancel_token().cancel();
    session.queue().close();

    if let Some(controls) = session.take_current_controls() {
        controls.stop();
    }
    let dropped = session.queue().clear();
    if dropped > 0 {
        debug!(%guild_id, dropped, "discarded pending queue");
    }

    session.set_state(PlayerState::TornDown);
    session.sink().disconnect().await;
    registry.remove(guild_id);
    session.refresh();

    info!(%guild_id, "session torn down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use crate::session::repeat::RepeatMode;
    use crate::session::testing::{CountingSync, MockSink, StartedPlay};
    use pretty_assertions::assert_eq;
    use serenity::model::id::{ChannelId, GuildId, UserId};
    use tokio::sync::mpsc::UnboundedReceiver;

    const GUILD: GuildId = GuildId::new(42);
    const IDLE: Duration = Duration::from_secs(300);

    fn track(title: &str, secs: u64) -> Track {
        Track::new(title, "https://cdn.example/stream", "https://example/page", UserId::new(9))
            .with_duration(Duration::from_secs(secs))
    }

    struct Fixture {
        registry: Arc<SessionRegistry>,
        session: Arc<Session>,
        starts: UnboundedReceiver<StartedPlay>,
        sink: Arc<MockSink>,
        sync: Arc<CountingSync>,
    }

    fn fixture() -> Fixture {
        let registry = SessionRegistry::new(IDLE);
        let (sink, starts) = MockSink::new();
        let sync = Arc::new(CountingSync::default());
        let session = registry.get_or_create(GUILD, {
            let sink = sink.clone();
            let sync = sync.clone();
            move || Session::new(GUILD, ChannelId::new(1), sink, sync)
        });
        Fixture {
            registry,
            session,
            starts,
            sink,
            sync,
        }
    }

    /// Waits for the registry entry to disappear, i.e. the loop finished
    /// its teardown.
    async fn wait_for_teardown(registry: &SessionRegistry) {
        while !registry.is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Waits until the loop has published the current-track slot, so the
    /// test can exercise skip/pause against it.
    async fn wait_for_current(session: &Session) {
        while session.current_track().is_none() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn plays_queue_in_fifo_order_then_clears_current() {
        let mut fx = fixture();
        fx.session.enqueue(track("a", 180)).unwrap();
        fx.session.enqueue(track("b", 200)).unwrap();

        let a = fx.starts.recv().await.unwrap();
        assert_eq!(a.track.title(), "a");
        wait_for_current(&fx.session).await;
        assert_eq!(fx.session.current_track().unwrap().title(), "a");
        a.controls.finish();

        let b = fx.starts.recv().await.unwrap();
        assert_eq!(b.track.title(), "b");
        b.controls.finish();

        // After b completes: queue empty, current cleared, session alive.
        while fx.session.current_track().is_some() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(fx.session.queue().is_empty());
        assert_eq!(fx.registry.len(), 1);
        assert_eq!(fx.sink.play_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn single_repeat_replays_the_same_track() {
        let mut fx = fixture();
        fx.session.set_repeat(Some(RepeatMode::Single));
        fx.session.enqueue(track("a", 120)).unwrap();

        // Initial play plus three repeats, nothing interleaved.
        for _ in 0..4 {
            let play = fx.starts.recv().await.unwrap();
            assert_eq!(play.track.title(), "a");
            play.controls.finish();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn all_repeat_cycles_queue_in_original_order() {
        let mut fx = fixture();
        fx.session.set_repeat(Some(RepeatMode::All));
        fx.session.enqueue(track("a", 100)).unwrap();
        fx.session.enqueue(track("b", 100)).unwrap();

        // After both complete once, the whole cycle repeats in the
        // original order.
        for expected in ["a", "b", "a", "b"] {
            let play = fx.starts.recv().await.unwrap();
            assert_eq!(play.track.title(), expected);
            play.controls.finish();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn skip_advances_exactly_once() {
        let mut fx = fixture();
        fx.session.enqueue(track("a", 300)).unwrap();
        fx.session.enqueue(track("b", 300)).unwrap();

        let a = fx.starts.recv().await.unwrap();
        wait_for_current(&fx.session).await;
        fx.session.skip().unwrap();

        let b = fx.starts.recv().await.unwrap();
        assert_eq!(b.track.title(), "b");
        // The skip stopped the sink once; the completion signal came from
        // that stop, not from a second path.
        assert_eq!(a.controls.stop_count(), 1);
        assert_eq!(fx.sink.play_count(), 2);
        assert!(fx.session.queue().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_start_skips_to_next_track() {
        let mut fx = fixture();
        fx.sink.fail_next_play();
        fx.session.enqueue(track("broken", 60)).unwrap();
        fx.session.enqueue(track("fine", 60)).unwrap();

        let play = fx.starts.recv().await.unwrap();
        assert_eq!(play.track.title(), "fine");
        assert_eq!(fx.registry.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_completion_sender_still_advances() {
        let mut fx = fixture();
        fx.session.enqueue(track("a", 60)).unwrap();
        fx.session.enqueue(track("b", 60)).unwrap();

        let a = fx.starts.recv().await.unwrap();
        a.controls.drop_sender();

        let b = fx.starts.recv().await.unwrap();
        assert_eq!(b.track.title(), "b");
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timeout_tears_down_and_removes_from_registry() {
        let fx = fixture();
        tokio::time::sleep(IDLE + Duration::from_secs(1)).await;
        wait_for_teardown(&fx.registry).await;
        assert_eq!(fx.session.state(), PlayerState::TornDown);
        assert!(fx.sink.disconnected());
    }

    #[tokio::test(start_paused = true)]
    async fn enqueue_just_before_timeout_keeps_session_alive() {
        let mut fx = fixture();
        tokio::time::sleep(IDLE - Duration::from_secs(1)).await;
        fx.session.enqueue(track("late", 30)).unwrap();

        let play = fx.starts.recv().await.unwrap();
        assert_eq!(play.track.title(), "late");
        assert_eq!(fx.registry.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_discards_queue_and_disconnects() {
        let mut fx = fixture();
        fx.session.enqueue(track("a", 300)).unwrap();
        fx.session.enqueue(track("b", 300)).unwrap();

        let a = fx.starts.recv().await.unwrap();
        fx.registry.stop(GUILD).unwrap();
        wait_for_teardown(&fx.registry).await;

        assert!(a.controls.stop_count() >= 1);
        assert!(fx.sink.disconnected());
        assert_eq!(fx.session.state(), PlayerState::TornDown);
        // Pending contents were discarded, not persisted.
        assert!(fx.session.queue().is_empty());
        // The queue is closed; late enqueues surface QueueClosed.
        assert_eq!(
            fx.session.enqueue(track("late", 10)),
            Err(SessionError::QueueClosed)
        );
        // Only one play ever started.
        assert_eq!(fx.sink.play_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_after_teardown_reports_not_connected() {
        let fx = fixture();
        fx.registry.stop(GUILD).unwrap();
        wait_for_teardown(&fx.registry).await;
        assert_eq!(fx.registry.stop(GUILD), Err(SessionError::NotConnected));
        assert_eq!(fx.registry.skip(GUILD), Err(SessionError::NotConnected));
    }

    /// Waits until the loop has announced `count` track starts.
    async fn wait_for_announcements(sync: &CountingSync, count: usize) {
        while sync.announcements().len() < count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn every_track_start_is_announced_to_the_session_channel() {
        let mut fx = fixture();
        fx.session.set_repeat(Some(RepeatMode::Single));
        fx.session.enqueue(track("a", 60)).unwrap();

        // Initial play and two repeat replays announce one message each.
        for _ in 0..2 {
            fx.starts.recv().await.unwrap().controls.finish();
        }
        wait_for_announcements(&fx.sync, 3).await;

        let announced = fx.sync.announcements();
        assert_eq!(announced.len(), 3);
        for (channel, announced_track) in &announced {
            assert_eq!(*channel, ChannelId::new(1));
            assert_eq!(announced_track.title(), "a");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_start_is_not_announced() {
        let mut fx = fixture();
        fx.sink.fail_next_play();
        fx.session.enqueue(track("broken", 60)).unwrap();
        fx.session.enqueue(track("fine", 60)).unwrap();

        fx.starts.recv().await.unwrap();
        wait_for_announcements(&fx.sync, 1).await;
        let announced = fx.sync.announcements();
        assert_eq!(announced.len(), 1);
        assert_eq!(announced[0].1.title(), "fine");
    }

    #[tokio::test(start_paused = true)]
    async fn refreshes_fire_on_state_changes() {
        let mut fx = fixture();
        let before = fx.sync.refreshes();
        fx.session.enqueue(track("a", 30)).unwrap();

        let play = fx.starts.recv().await.unwrap();
        play.controls.finish();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Enqueue, track start and track end each poked the sync.
        assert!(fx.sync.refreshes() >= before + 3);
        // No refresh showed a discarded track as still current.
        if let Some(last) = fx.sync.last_snapshot() {
            assert!(last.current.is_none());
        }
    }
}
