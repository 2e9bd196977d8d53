use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};
use std::time::Duration;

use crate::session::{PlayerState, SessionSnapshot, Track};

/// Standard color palette.
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const ERROR_RED: Colour = Colour::from_rgb(220, 53, 69);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
    pub const NEUTRAL_GRAY: Colour = Colour::from_rgb(108, 117, 125);
}

const FOOTER: &str = "🎵 Encore";

pub fn now_playing_embed(track: &Track) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("🎵 Now Playing")
        .description(format!("[{}]({})", track.title(), track.page_url()))
        .color(colors::SUCCESS_GREEN)
        .field("Requested by", format!("<@{}>", track.requested_by()), true)
        .field("Length", duration_field(track.duration()), true);

    if let Some(thumbnail) = track.thumbnail() {
        embed = embed.thumbnail(thumbnail);
    }

    embed.timestamp(Timestamp::now()).footer(CreateEmbedFooter::new(FOOTER))
}

pub fn track_added_embed(track: &Track, position: usize) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("✅ Added to Queue")
        .description(format!("[{}]({})", track.title(), track.page_url()))
        .color(colors::SUCCESS_GREEN)
        .field("Position", format!("#{position}"), true)
        .field("Length", duration_field(track.duration()), true);

    if let Some(thumbnail) = track.thumbnail() {
        embed = embed.thumbnail(thumbnail);
    }

    embed.footer(CreateEmbedFooter::new(FOOTER))
}

/// Current track plus up to ten upcoming entries.
pub fn queue_embed(snapshot: &SessionSnapshot) -> CreateEmbed {
    let mut embed = CreateEmbed::default().title("📋 Queue").color(colors::INFO_BLUE);

    match &snapshot.current {
        Some(current) => {
            embed = embed.field(
                "Now playing",
                format!(
                    "[{}]({}) | `{}`",
                    current.title(),
                    current.page_url(),
                    duration_field(current.duration())
                ),
                false,
            );
        }
        None => {
            embed = embed.field("Now playing", "Nothing right now", false);
        }
    }

    if snapshot.upcoming.is_empty() {
        embed = embed.field("Up next", "The queue is empty", false);
    } else {
        let mut lines = String::new();
        for (i, track) in snapshot.upcoming.iter().take(10).enumerate() {
            lines.push_str(&format!(
                "`{}.` [{}]({}) | `{}`\n",
                i + 1,
                track.title(),
                track.page_url(),
                duration_field(track.duration())
            ));
        }
        if snapshot.upcoming.len() > 10 {
            lines.push_str(&format!("… and {} more", snapshot.upcoming.len() - 10));
        }
        embed = embed.field("Up next", lines, false);
    }

    let total = snapshot.queue_len() + usize::from(snapshot.current.is_some());
    embed
        .field(
            "Info",
            format!(
                "▸ Tracks: {total}\n▸ Total length: {}\n▸ Repeat: {}",
                format_duration(snapshot.total_duration()),
                snapshot.repeat.label()
            ),
            false,
        )
        .footer(CreateEmbedFooter::new(FOOTER))
}

/// The pinned controller message body.
pub fn controller_embed(snapshot: &SessionSnapshot) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("🎮 Music Controller")
        .description("Use the buttons below to control playback.")
        .color(colors::INFO_BLUE);

    match (&snapshot.current, snapshot.state) {
        (Some(current), _) => {
            embed = embed.field(
                "Now playing",
                format!("[{}]({})", current.title(), current.page_url()),
                false,
            );
            if let Some(thumbnail) = current.thumbnail() {
                embed = embed.thumbnail(thumbnail);
            }
            let state = if snapshot.paused { "Paused ⏸️" } else { "Playing ▶️" };
            embed = embed
                .field("State", state, true)
                .field("Length", duration_field(current.duration()), true)
                .field("Queue", format!("{} track(s)", snapshot.queue_len()), true)
                .field("Repeat", snapshot.repeat.label(), true);
        }
        (None, PlayerState::TornDown) => {
            embed = embed
                .field("Now playing", "Nothing — the session has ended", false)
                .color(colors::NEUTRAL_GRAY);
        }
        (None, _) => {
            embed = embed.field("Now playing", "Nothing right now", false);
        }
    }

    embed.footer(CreateEmbedFooter::new(FOOTER))
}

/// Controller placeholder before any session exists for the guild.
pub fn idle_controller_embed() -> CreateEmbed {
    CreateEmbed::default()
        .title("🎮 Music Controller")
        .description("Use the buttons below to control playback, or just type a song name in the music channel.")
        .color(colors::INFO_BLUE)
        .field("Now playing", "Nothing right now", false)
        .footer(CreateEmbedFooter::new(FOOTER))
}

pub fn error_embed(message: &str) -> CreateEmbed {
    CreateEmbed::default()
        .description(format!("❌ {message}"))
        .color(colors::ERROR_RED)
}

fn duration_field(duration: Option<Duration>) -> String {
    match duration {
        Some(d) => format_duration(d),
        None => "🔴 live".to_owned(),
    }
}

pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}
