use anyhow::Result;
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::SerenityInit;
use std::sync::Arc;
use tracing::{error, info};

mod bot;
mod config;
mod controller;
mod error;
mod session;
mod sources;
mod storage;
mod ui;
mod voice;

use crate::bot::EncoreBot;
use crate::config::Config;
use crate::controller::DiscordControllerSync;
use crate::session::SessionRegistry;
use crate::sources::YtDlpResolver;
use crate::storage::JsonStorage;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("encore=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 starting encore v{}", env!("CARGO_PKG_VERSION"));

    let config = Arc::new(Config::load()?);
    YtDlpResolver::check().await?;

    let storage = Arc::new(tokio::sync::Mutex::new(
        JsonStorage::new(config.data_dir.clone()).await?,
    ));
    let registry = SessionRegistry::new(config.idle_timeout());
    let resolver = Arc::new(YtDlpResolver::new());
    let http_client = reqwest::Client::new();

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    // The controller sync task needs an Http handle before the client
    // exists, so build one from the same token.
    let http = Arc::new(serenity::http::Http::new(&config.discord_token));
    let sync = DiscordControllerSync::new(http);

    let handler = EncoreBot::new(
        config.clone(),
        registry.clone(),
        resolver,
        sync,
        storage,
        http_client,
    );

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird()
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(%err, "failed to listen for shutdown signal");
            return;
        }
        info!("shutdown signal received, stopping sessions");
        shard_manager.shutdown_all().await;
    });

    info!("🚀 connecting to Discord");
    if let Err(err) = client.start().await {
        error!(%err, "client error");
    }

    Ok(())
}
