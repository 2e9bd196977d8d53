use crate::session::track::Track;

/// Repeat behavior applied when the current track finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatMode {
    #[default]
    Off,
    /// Replay the finished track immediately.
    Single,
    /// Send the finished track to the back of the queue.
    All,
}

impl RepeatMode {
    /// The user pressed the repeat button (or ran the command with no
    /// target): Off -> Single -> All -> Off.
    pub fn cycled(self) -> Self {
        match self {
            Self::Off => Self::Single,
            Self::Single => Self::All,
            Self::All => Self::Off,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "off" | "none" => Some(Self::Off),
            "single" | "track" | "one" => Some(Self::Single),
            "all" | "queue" => Some(Self::All),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Single => "single track 🔂",
            Self::All => "whole queue 🔁",
        }
    }
}

/// What the player loop should do with a track that just finished.
#[derive(Debug)]
pub enum RequeueDecision {
    Discard,
    /// Re-enqueue at the head; the track plays again immediately.
    Front(Track),
    /// Re-enqueue at the tail; the track comes back around.
    Back(Track),
}

/// The single place repeat handling happens. The player loop calls this
/// once per finished track and applies the decision verbatim.
pub fn on_track_finished(mode: RepeatMode, finished: Track) -> RequeueDecision {
    match mode {
        RepeatMode::Off => RequeueDecision::Discard,
        RepeatMode::Single => RequeueDecision::Front(finished),
        RepeatMode::All => RequeueDecision::Back(finished),
    }
}

// Tracks carry no identity to compare; two decisions are equal when they
// agree on placement.
impl PartialEq for RequeueDecision {
    fn eq(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (Self::Discard, Self::Discard) | (Self::Front(_), Self::Front(_)) | (Self::Back(_), Self::Back(_))
        )
    }
}
