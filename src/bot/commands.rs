use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{application::CommandOptionType, id::GuildId, Permissions},
    prelude::Context,
};

/// Registers slash commands globally (~1 h propagation).
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    for command in all_commands() {
        ctx.http.create_global_command(&command).await?;
    }
    Ok(())
}

/// Registers slash commands for one guild (~1 s propagation; development).
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, all_commands()).await?;
    Ok(())
}

fn all_commands() -> Vec<CreateCommand> {
    vec![
        play_command(),
        skip_command(),
        stop_command(),
        pause_command(),
        resume_command(),
        queue_command(),
        repeat_command(),
        controller_command(),
        music_channel_command(),
    ]
}

fn play_command() -> CreateCommand {
    CreateCommand::new("play")
        .description("Search for a song and add it to the queue")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "query", "URL or search terms")
                .required(true),
        )
}

fn skip_command() -> CreateCommand {
    CreateCommand::new("skip").description("Skip the current track")
}

fn stop_command() -> CreateCommand {
    CreateCommand::new("stop").description("Stop playback, clear the queue and leave the voice channel")
}

fn pause_command() -> CreateCommand {
    CreateCommand::new("pause").description("Pause the current track")
}

fn resume_command() -> CreateCommand {
    CreateCommand::new("resume").description("Resume a paused track")
}

fn queue_command() -> CreateCommand {
    CreateCommand::new("queue").description("Show the current queue")
}

fn repeat_command() -> CreateCommand {
    CreateCommand::new("repeat")
        .description("Set the repeat mode (cycles when no mode is given)")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "mode", "Repeat mode")
                .add_string_choice("off", "off")
                .add_string_choice("single track", "single")
                .add_string_choice("whole queue", "all"),
        )
}

fn controller_command() -> CreateCommand {
    CreateCommand::new("controller").description("Pin a music controller in this channel")
}

fn music_channel_command() -> CreateCommand {
    CreateCommand::new("musicchannel")
        .description("Bind or unbind this channel as the music-only channel")
        .default_member_permissions(Permissions::MANAGE_CHANNELS)
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "action", "What to do")
                .add_string_choice("set", "set")
                .add_string_choice("unset", "unset")
                .required(true),
        )
}
