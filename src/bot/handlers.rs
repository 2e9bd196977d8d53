use serenity::{
    builder::CreateEmbed,
    model::id::{ChannelId, GuildId, UserId},
    prelude::Context,
};
use std::sync::Arc;
use tracing::warn;

use crate::bot::EncoreBot;
use crate::error::SessionError;
use crate::session::{RepeatMode, Session};
use crate::ui::{buttons, embeds};
use crate::voice::DiscordSink;

/// Everything a command needs to know about where it was invoked.
pub struct CommandContext {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub user_id: UserId,
    /// The voice channel the invoking user currently sits in, if any.
    pub voice_channel: Option<ChannelId>,
}

impl CommandContext {
    pub fn build(
        ctx: &Context,
        guild_id: GuildId,
        channel_id: ChannelId,
        user_id: UserId,
    ) -> Self {
        let voice_channel = ctx.cache.guild(guild_id).and_then(|guild| {
            guild
                .voice_states
                .get(&user_id)
                .and_then(|state| state.channel_id)
        });

        Self {
            guild_id,
            channel_id,
            user_id,
            voice_channel,
        }
    }
}

/// What a handler wants shown to the user.
pub enum Reply {
    Text(String),
    Embed(CreateEmbed),
}

impl Reply {
    fn error(message: impl AsRef<str>) -> Self {
        Reply::Embed(embeds::error_embed(message.as_ref()))
    }
}

fn not_connected() -> Reply {
    Reply::error("Nothing is playing in this server!")
}

/// Resolves `query`, joins the user's voice channel if needed and queues
/// the track on the guild's session.
pub async fn play(bot: &EncoreBot, ctx: &Context, cctx: CommandContext, query: &str) -> Reply {
    let Some(voice_channel) = cctx.voice_channel else {
        return Reply::error("Join a voice channel first!");
    };

    let track = match bot.resolver.resolve(query, cctx.user_id).await {
        Ok(track) => track,
        Err(err) => return Reply::error(format!("Could not load this track: {err}")),
    };

    let manager = songbird::get(ctx)
        .await
        .expect("songbird registered at client init")
        .clone();
    let call = match manager.join(cctx.guild_id, voice_channel).await {
        Ok(call) => call,
        Err(err) => {
            warn!(guild_id = %cctx.guild_id, %err, "failed to join voice channel");
            return Reply::error("Could not join your voice channel.");
        }
    };

    let session = bot.registry.get_or_create(cctx.guild_id, || {
        Session::new(
            cctx.guild_id,
            cctx.channel_id,
            Arc::new(DiscordSink::new(
                call.clone(),
                bot.http_client.clone(),
                bot.config.default_volume,
            )),
            bot.sync.clone(),
        )
    });

    match session.enqueue(track.clone()) {
        Ok(()) => Reply::Embed(embeds::track_added_embed(&track, session.queue().len())),
        Err(SessionError::QueueClosed) => {
            Reply::error("That session just shut down, try again!")
        }
        Err(err) => Reply::error(err.to_string()),
    }
}

pub fn skip(bot: &EncoreBot, cctx: &CommandContext) -> Reply {
    match bot.registry.skip(cctx.guild_id) {
        Ok(()) => Reply::Text("⏭️ Skipped!".to_owned()),
        Err(_) => not_connected(),
    }
}

pub fn stop(bot: &EncoreBot, cctx: &CommandContext) -> Reply {
    match bot.registry.stop(cctx.guild_id) {
        Ok(()) => Reply::Text("⏹️ Stopped playback and left the voice channel!".to_owned()),
        Err(_) => not_connected(),
    }
}

pub fn pause(bot: &EncoreBot, cctx: &CommandContext) -> Reply {
    match bot.registry.pause(cctx.guild_id) {
        Ok(()) => Reply::Text("⏸️ Paused.".to_owned()),
        Err(_) => not_connected(),
    }
}

pub fn resume(bot: &EncoreBot, cctx: &CommandContext) -> Reply {
    match bot.registry.resume(cctx.guild_id) {
        Ok(()) => Reply::Text("▶️ Resumed.".to_owned()),
        Err(_) => not_connected(),
    }
}

/// The controller's play/pause button.
pub fn toggle_pause(bot: &EncoreBot, cctx: &CommandContext) -> Reply {
    let Some(session) = bot.registry.get(cctx.guild_id) else {
        return not_connected();
    };
    match session.toggle_pause() {
        Ok(true) => Reply::Text("⏸️ Paused.".to_owned()),
        Ok(false) => Reply::Text("▶️ Resumed.".to_owned()),
        Err(_) => not_connected(),
    }
}

pub fn queue(bot: &EncoreBot, cctx: &CommandContext) -> Reply {
    match bot.registry.snapshot(cctx.guild_id) {
        Some(snapshot) => Reply::Embed(embeds::queue_embed(&snapshot)),
        None => not_connected(),
    }
}

pub fn repeat(bot: &EncoreBot, cctx: &CommandContext, target: Option<RepeatMode>) -> Reply {
    match bot.registry.set_repeat(cctx.guild_id, target) {
        Ok(RepeatMode::Off) => Reply::Text("🔁 Repeat is now off.".to_owned()),
        Ok(RepeatMode::Single) => Reply::Text("🔂 Repeating the current track.".to_owned()),
        Ok(RepeatMode::All) => Reply::Text("🔁 Repeating the whole queue.".to_owned()),
        Err(_) => not_connected(),
    }
}

/// Creates (or re-creates) the pinned controller message in the invoking
/// channel and points future refreshes at it.
pub async fn controller(bot: &EncoreBot, ctx: &Context, cctx: &CommandContext) -> Reply {
    // An older controller for this guild is superseded; best-effort delete.
    if let Some((channel, message)) = bot.sync.registered_message(cctx.guild_id) {
        if let Err(err) = channel.delete_message(&ctx.http, message).await {
            warn!(guild_id = %cctx.guild_id, %err, "failed to delete old controller");
        }
    }

    let snapshot = bot.registry.snapshot(cctx.guild_id);
    let (embed, repeat) = match &snapshot {
        Some(snapshot) => (embeds::controller_embed(snapshot), snapshot.repeat),
        None => (embeds::idle_controller_embed(), RepeatMode::Off),
    };

    let builder = serenity::builder::CreateMessage::new()
        .embed(embed)
        .components(vec![buttons::control_row(repeat)]);
    let message = match cctx.channel_id.send_message(&ctx.http, builder).await {
        Ok(message) => message,
        Err(err) => {
            warn!(guild_id = %cctx.guild_id, %err, "failed to send controller message");
            return Reply::error("Could not create the controller here.");
        }
    };

    if let Err(err) = message.pin(&ctx.http).await {
        warn!(guild_id = %cctx.guild_id, %err, "failed to pin controller message");
    }

    bot.sync
        .register(cctx.guild_id, cctx.channel_id, message.id);
    Reply::Text("🎮 Controller created!".to_owned())
}

/// Binds or unbinds the invoking channel as the guild's music channel.
/// Binding also drops a controller in it.
pub async fn music_channel(
    bot: &EncoreBot,
    ctx: &Context,
    cctx: &CommandContext,
    action: &str,
) -> Reply {
    match action {
        "set" => {
            let result = {
                let mut storage = bot.storage.lock().await;
                storage.set_music_channel(cctx.guild_id, cctx.channel_id).await
            };
            if let Err(err) = result {
                warn!(guild_id = %cctx.guild_id, %err, "failed to persist music channel");
                return Reply::error("Could not save the music channel binding.");
            }
            // Controller errors come back as embeds; surface them as-is.
            if let reply @ Reply::Embed(_) = controller(bot, ctx, cctx).await {
                return reply;
            }
            Reply::Text(
                "🎵 This is now the music channel! Type a song name here to play it."
                    .to_owned(),
            )
        }
        "unset" => {
            let removed = {
                let mut storage = bot.storage.lock().await;
                storage.unset_music_channel(cctx.guild_id).await
            };
            match removed {
                Ok(Some(channel)) => {
                    Reply::Text(format!("🔇 <#{channel}> is no longer the music channel."))
                }
                Ok(None) => Reply::error("No music channel is bound in this server."),
                Err(err) => {
                    warn!(guild_id = %cctx.guild_id, %err, "failed to persist music channel");
                    Reply::error("Could not save the music channel binding.")
                }
            }
        }
        other => Reply::error(format!("Unknown action `{other}`.")),
    }
}
