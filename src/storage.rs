use anyhow::Result;
use serde::{Deserialize, Serialize};
use serenity::model::id::{ChannelId, GuildId};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, warn};

const MUSIC_CHANNELS_FILE: &str = "music_channels.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct MusicChannels {
    /// guild id -> bound text channel id
    channels: HashMap<u64, u64>,
}

/// JSON-file persistence for the music-only channel bindings. Queue
/// contents are deliberately not persisted; sessions are rebuilt from
/// scratch after a restart.
pub struct JsonStorage {
    data_dir: PathBuf,
    music_channels: MusicChannels,
}

impl JsonStorage {
    pub async fn new(data_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&data_dir).await?;

        let path = data_dir.join(MUSIC_CHANNELS_FILE);
        let music_channels = match fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<MusicChannels>(&raw) {
                Ok(parsed) => {
                    info!(bindings = parsed.channels.len(), "loaded music channel bindings");
                    parsed
                }
                Err(err) => {
                    warn!(%err, path = %path.display(), "music channel file is corrupt, starting fresh");
                    MusicChannels::default()
                }
            },
            Err(_) => MusicChannels::default(),
        };

        Ok(Self {
            data_dir,
            music_channels,
        })
    }

    pub fn music_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        self.music_channels
            .channels
            .get(&guild_id.get())
            .map(|id| ChannelId::new(*id))
    }

    pub async fn set_music_channel(&mut self, guild_id: GuildId, channel_id: ChannelId) -> Result<()> {
        self.music_channels
            .channels
            .insert(guild_id.get(), channel_id.get());
        self.save().await
    }

    /// Returns the channel that was bound, if any.
    pub async fn unset_music_channel(&mut self, guild_id: GuildId) -> Result<Option<ChannelId>> {
        let removed = self.music_channels.channels.remove(&guild_id.get());
        if removed.is_some() {
            self.save().await?;
        }
        Ok(removed.map(ChannelId::new))
    }

    async fn save(&self) -> Result<()> {
        let path = self.data_dir.join(MUSIC_CHANNELS_FILE);
        let raw = serde_json::to_string_pretty(&self.music_channels)?;
        fs::write(&path, raw).await?;
        Ok(())
    }
}
