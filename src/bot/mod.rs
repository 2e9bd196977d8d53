//! Discord-facing layer: slash commands, controller buttons and the
//! music-channel message listener, all dispatching into the per-guild
//! sessions.

use anyhow::Result;
use serenity::{
    all::{
        ActivityData, CommandInteraction, ComponentInteraction, Context, EventHandler,
        GuildId, Interaction, Message, Ready, ResolvedValue, VoiceState,
    },
    async_trait,
    builder::{
        CreateInteractionResponse, CreateInteractionResponseMessage, CreateMessage,
        EditInteractionResponse,
    },
};
use std::sync::Arc;
use tracing::{error, info, warn};

pub mod commands;
pub mod handlers;

use crate::config::Config;
use crate::controller::DiscordControllerSync;
use crate::session::{RepeatMode, SessionRegistry};
use crate::sources::Resolver;
use crate::storage::JsonStorage;
use crate::ui::buttons::ControlAction;

use handlers::{CommandContext, Reply};

/// The serenity [`EventHandler`] plus everything the handlers need.
pub struct EncoreBot {
    pub config: Arc<Config>,
    pub registry: Arc<SessionRegistry>,
    pub resolver: Arc<dyn Resolver>,
    pub sync: Arc<DiscordControllerSync>,
    pub storage: Arc<tokio::sync::Mutex<JsonStorage>>,
    /// Shared with every [`crate::voice::DiscordSink`] for audio streaming.
    pub http_client: reqwest::Client,
}

impl EncoreBot {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<SessionRegistry>,
        resolver: Arc<dyn Resolver>,
        sync: Arc<DiscordControllerSync>,
        storage: Arc<tokio::sync::Mutex<JsonStorage>>,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            config,
            registry,
            resolver,
            sync,
            storage,
            http_client,
        }
    }

    async fn dispatch_command(&self, ctx: &Context, command: &CommandInteraction) -> Result<()> {
        let Some(guild_id) = command.guild_id else {
            let builder = CreateInteractionResponseMessage::new()
                .content("This bot only works inside a server.")
                .ephemeral(true);
            command
                .create_response(&ctx.http, CreateInteractionResponse::Message(builder))
                .await?;
            return Ok(());
        };

        let cctx = CommandContext::build(ctx, guild_id, command.channel_id, command.user.id);
        let name = command.data.name.as_str();

        // Resolution and voice joins are slow; everything else answers
        // within the three-second interaction window.
        if name == "play" {
            command.defer(&ctx.http).await?;
            let query = first_string_option(command).unwrap_or_default();
            let reply = handlers::play(self, ctx, cctx, &query).await;
            let builder = match reply {
                Reply::Text(text) => EditInteractionResponse::new().content(text),
                Reply::Embed(embed) => EditInteractionResponse::new().embed(embed),
            };
            command.edit_response(&ctx.http, builder).await?;
            return Ok(());
        }

        let reply = match name {
            "skip" => handlers::skip(self, &cctx),
            "stop" => handlers::stop(self, &cctx),
            "pause" => handlers::pause(self, &cctx),
            "resume" => handlers::resume(self, &cctx),
            "queue" => handlers::queue(self, &cctx),
            "repeat" => {
                let target = first_string_option(command)
                    .as_deref()
                    .and_then(RepeatMode::parse);
                handlers::repeat(self, &cctx, target)
            }
            "controller" => handlers::controller(self, ctx, &cctx).await,
            "musicchannel" => {
                let action = first_string_option(command).unwrap_or_default();
                handlers::music_channel(self, ctx, &cctx, &action).await
            }
            other => {
                warn!(command = other, "unknown slash command");
                return Ok(());
            }
        };

        let builder = match reply {
            Reply::Text(text) => CreateInteractionResponseMessage::new().content(text),
            Reply::Embed(embed) => CreateInteractionResponseMessage::new().embed(embed),
        };
        command
            .create_response(&ctx.http, CreateInteractionResponse::Message(builder))
            .await?;
        Ok(())
    }

    async fn dispatch_component(
        &self,
        ctx: &Context,
        component: &ComponentInteraction,
    ) -> Result<()> {
        let Some(guild_id) = component.guild_id else {
            return Ok(());
        };
        let Some(action) = ControlAction::from_custom_id(&component.data.custom_id) else {
            return Ok(());
        };

        let cctx = CommandContext::build(ctx, guild_id, component.channel_id, component.user.id);
        let reply = match action {
            ControlAction::PlayPause => handlers::toggle_pause(self, &cctx),
            ControlAction::Skip => handlers::skip(self, &cctx),
            ControlAction::Stop => handlers::stop(self, &cctx),
            ControlAction::Repeat => handlers::repeat(self, &cctx, None),
            ControlAction::Queue => handlers::queue(self, &cctx),
        };

        let builder = match reply {
            Reply::Text(text) => CreateInteractionResponseMessage::new()
                .content(text)
                .ephemeral(true),
            Reply::Embed(embed) => CreateInteractionResponseMessage::new()
                .embed(embed)
                .ephemeral(true),
        };
        component
            .create_response(&ctx.http, CreateInteractionResponse::Message(builder))
            .await?;
        Ok(())
    }

    /// Plain text in the bound music channel is treated as a play query.
    async fn handle_music_channel_message(&self, ctx: &Context, msg: &Message) -> Result<()> {
        let Some(guild_id) = msg.guild_id else {
            return Ok(());
        };

        let bound = {
            let storage = self.storage.lock().await;
            storage.music_channel(guild_id)
        };
        if bound != Some(msg.channel_id) {
            return Ok(());
        }

        let query = msg.content.trim();
        if query.is_empty() {
            return Ok(());
        }

        let cctx = CommandContext::build(ctx, guild_id, msg.channel_id, msg.author.id);
        let reply = handlers::play(self, ctx, cctx, query).await;
        let builder = match reply {
            Reply::Text(text) => CreateMessage::new().content(text),
            Reply::Embed(embed) => CreateMessage::new().embed(embed),
        };
        msg.channel_id.send_message(&ctx.http, builder).await?;
        Ok(())
    }
}

fn first_string_option(command: &CommandInteraction) -> Option<String> {
    command.data.options().into_iter().find_map(|opt| match opt.value {
        ResolvedValue::String(s) => Some(s.to_owned()),
        _ => None,
    })
}

#[async_trait]
impl EventHandler for EncoreBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, guilds = ready.guilds.len(), "connected");

        let registered = match self.config.guild_id {
            Some(guild_id) => {
                commands::register_guild_commands(&ctx, GuildId::new(guild_id)).await
            }
            None => commands::register_global_commands(&ctx).await,
        };
        if let Err(err) = registered {
            error!(%err, "failed to register slash commands");
        }

        ctx.set_activity(Some(ActivityData::listening("/play")));
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command) => {
                if let Err(err) = self.dispatch_command(&ctx, &command).await {
                    error!(command = %command.data.name, %err, "command failed");
                }
            }
            Interaction::Component(component) => {
                if let Err(err) = self.dispatch_component(&ctx, &component).await {
                    error!(custom_id = %component.data.custom_id, %err, "component failed");
                }
            }
            _ => {}
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        if let Err(err) = self.handle_music_channel_message(&ctx, &msg).await {
            warn!(%err, "music channel message failed");
        }
    }

    /// Kicking the bot out of voice by hand must tear the session down the
    /// same way `/stop` does, or the player loop keeps feeding a dead call.
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id {
            return;
        }
        if old.is_some() && new.channel_id.is_none() {
            if let Some(guild_id) = new.guild_id {
                info!(%guild_id, "disconnected from voice, stopping session");
                let _ = self.registry.stop(guild_id);
            }
        }
    }
}
