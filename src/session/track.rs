use chrono::{DateTime, Utc};
use serenity::model::id::UserId;
use std::time::Duration;

/// One playable item: display metadata plus the resolved stream URL the
/// audio sink can play directly. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct Track {
    title: String,
    stream_url: String,
    page_url: String,
    duration: Option<Duration>,
    thumbnail: Option<String>,
    requested_by: UserId,
    requested_at: DateTime<Utc>,
}

impl Track {
    pub fn new(
        title: impl Into<String>,
        stream_url: impl Into<String>,
        page_url: impl Into<String>,
        requested_by: UserId,
    ) -> Self {
        Self {
            title: title.into(),
            stream_url: stream_url.into(),
            page_url: page_url.into(),
            duration: None,
            thumbnail: None,
            requested_by,
            requested_at: Utc::now(),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Direct media URL handed to the audio sink.
    pub fn stream_url(&self) -> &str {
        &self.stream_url
    }

    /// Source page URL, used for display links.
    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn thumbnail(&self) -> Option<&str> {
        self.thumbnail.as_deref()
    }

    pub fn requested_by(&self) -> UserId {
        self.requested_by
    }

    pub fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
    }
}
