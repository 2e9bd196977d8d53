use async_trait::async_trait;
use parking_lot::Mutex;
use songbird::{
    input::HttpRequest,
    tracks::{PlayMode, TrackHandle},
    Call, Event, EventContext, EventHandler as VoiceEventHandler, TrackEvent,
};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::PlaybackError;
use crate::session::{AudioSink, PlaybackControls, Playing, Track, TrackEnd};

/// The songbird-backed audio sink: one per session, wrapping that guild's
/// voice [`Call`]. Streams the track's resolved URL straight into the
/// driver and reports completion through track events.
pub struct DiscordSink {
    call: Arc<tokio::sync::Mutex<Call>>,
    http: reqwest::Client,
    volume: f32,
}

impl DiscordSink {
    pub fn new(call: Arc<tokio::sync::Mutex<Call>>, http: reqwest::Client, volume: f32) -> Self {
        Self { call, http, volume }
    }
}

#[async_trait]
impl AudioSink for DiscordSink {
    async fn play(&self, track: &Track) -> Result<Playing, PlaybackError> {
        let input = HttpRequest::new(self.http.clone(), track.stream_url().to_owned());

        let handle = {
            let mut call = self.call.lock().await;
            call.play_input(input.into())
        };
        let _ = handle.set_volume(self.volume);

        // One sender shared by the End and Error registrations; whichever
        // fires first takes it, so exactly one signal reaches the loop.
        let (tx, rx) = oneshot::channel();
        let finished = Arc::new(Mutex::new(Some(tx)));

        handle
            .add_event(
                Event::Track(TrackEvent::End),
                TrackEndNotifier {
                    finished: finished.clone(),
                },
            )
            .map_err(|e| PlaybackError(format!("failed to attach end handler: {e}")))?;
        handle
            .add_event(
                Event::Track(TrackEvent::Error),
                TrackErrorNotifier { finished },
            )
            .map_err(|e| PlaybackError(format!("failed to attach error handler: {e}")))?;

        Ok(Playing {
            finished: rx,
            controls: Arc::new(HandleControls(handle)),
        })
    }

    async fn disconnect(&self) {
        let mut call = self.call.lock().await;
        if let Err(err) = call.leave().await {
            warn!(%err, "failed to leave voice channel");
        }
    }
}

struct HandleControls(TrackHandle);

impl PlaybackControls for HandleControls {
    fn stop(&self) {
        let _ = self.0.stop();
    }

    fn pause(&self) {
        let _ = self.0.pause();
    }

    fn resume(&self) {
        let _ = self.0.play();
    }
}

struct TrackEndNotifier {
    finished: Arc<Mutex<Option<oneshot::Sender<TrackEnd>>>>,
}

#[async_trait]
impl VoiceEventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        // A manual stop and a natural end both arrive here; the play mode
        // tells them apart for logging.
        let end = match ctx {
            EventContext::Track([(state, _), ..]) if state.playing == PlayMode::Stop => {
                TrackEnd::Stopped
            }
            _ => TrackEnd::Finished,
        };
        if let Some(tx) = self.finished.lock().take() {
            debug!(?end, "track end event");
            let _ = tx.send(end);
        }
        None
    }
}

struct TrackErrorNotifier {
    finished: Arc<Mutex<Option<oneshot::Sender<TrackEnd>>>>,
}

#[async_trait]
impl VoiceEventHandler for TrackErrorNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::Track([(state, _), ..]) = ctx {
            warn!(playing = ?state.playing, "track errored");
        }
        if let Some(tx) = self.finished.lock().take() {
            let _ = tx.send(TrackEnd::Errored);
        }
        None
    }
}
