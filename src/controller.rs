use dashmap::DashMap;
use serenity::{
    builder::{CreateMessage, EditMessage},
    http::Http,
    model::id::{ChannelId, GuildId, MessageId},
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, warn};

use crate::session::{ControllerSync, SessionSnapshot, Track};
use crate::ui::{buttons, embeds};

/// Where a guild's pinned controller message lives.
#[derive(Debug, Clone, Copy)]
struct ControllerMessage {
    channel: ChannelId,
    message: MessageId,
}

enum SyncEvent {
    Refresh(SessionSnapshot),
    Started { channel: ChannelId, track: Track },
}

/// Discord-facing [`ControllerSync`]: events are pushed onto a channel and
/// a background task does the actual Discord I/O.
///
/// Neither hook blocks a player loop. The task keeps only the newest
/// snapshot per guild, so a burst of transitions collapses into one edit
/// of the pinned controller message; track starts are announcements and
/// go out one message each, in order.
pub struct DiscordControllerSync {
    tx: UnboundedSender<SyncEvent>,
    controllers: Arc<DashMap<GuildId, ControllerMessage>>,
}

impl DiscordControllerSync {
    pub fn new(http: Arc<Http>) -> Arc<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<SyncEvent>();
        let controllers: Arc<DashMap<GuildId, ControllerMessage>> = Arc::new(DashMap::new());

        let task_controllers = controllers.clone();
        tokio::spawn(async move {
            while let Some(first) = rx.recv().await {
                let mut latest: HashMap<GuildId, SessionSnapshot> = HashMap::new();
                let mut started: Vec<(ChannelId, Track)> = Vec::new();

                let mut pending = Some(first);
                loop {
                    match pending.take() {
                        Some(SyncEvent::Refresh(snapshot)) => {
                            latest.insert(snapshot.guild_id, snapshot);
                        }
                        Some(SyncEvent::Started { channel, track }) => {
                            started.push((channel, track));
                        }
                        None => break,
                    }
                    pending = rx.try_recv().ok();
                }

                for (channel, track) in started {
                    let builder = CreateMessage::new().embed(embeds::now_playing_embed(&track));
                    if let Err(err) = channel.send_message(&http, builder).await {
                        warn!(%channel, %err, "failed to send now-playing message");
                    }
                }

                for (guild_id, snapshot) in latest {
                    let Some(target) = task_controllers.get(&guild_id).map(|c| *c) else {
                        continue;
                    };
                    let builder = EditMessage::new()
                        .embed(embeds::controller_embed(&snapshot))
                        .components(vec![buttons::control_row(snapshot.repeat)]);
                    if let Err(err) = target
                        .channel
                        .edit_message(&http, target.message, builder)
                        .await
                    {
                        warn!(%guild_id, %err, "failed to update controller message");
                    }
                }
            }
        });

        Arc::new(Self { tx, controllers })
    }

    /// Points future refreshes for `guild_id` at this message, replacing
    /// any previous controller.
    pub fn register(&self, guild_id: GuildId, channel: ChannelId, message: MessageId) {
        debug!(%guild_id, %channel, "controller registered");
        self.controllers
            .insert(guild_id, ControllerMessage { channel, message });
    }

    pub fn registered_message(&self, guild_id: GuildId) -> Option<(ChannelId, MessageId)> {
        self.controllers
            .get(&guild_id)
            .map(|c| (c.channel, c.message))
    }
}

impl ControllerSync for DiscordControllerSync {
    fn refresh(&self, snapshot: &SessionSnapshot) {
        // Send failure means the task is gone during shutdown; nothing to do.
        let _ = self.tx.send(SyncEvent::Refresh(snapshot.clone()));
    }

    fn track_started(&self, channel: ChannelId, track: &Track) {
        let _ = self.tx.send(SyncEvent::Started {
            channel,
            track: track.clone(),
        });
    }
}
