use serenity::{
    all::ButtonStyle,
    builder::{CreateActionRow, CreateButton},
};

use crate::session::RepeatMode;

/// Custom ids for the controller buttons.
pub mod button_ids {
    pub const PLAY_PAUSE: &str = "music_play_pause";
    pub const SKIP: &str = "music_skip";
    pub const STOP: &str = "music_stop";
    pub const REPEAT: &str = "music_repeat";
    pub const QUEUE: &str = "music_queue";
}

/// Action a component interaction maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    PlayPause,
    Skip,
    Stop,
    Repeat,
    Queue,
}

impl ControlAction {
    pub fn from_custom_id(id: &str) -> Option<Self> {
        match id {
            button_ids::PLAY_PAUSE => Some(Self::PlayPause),
            button_ids::SKIP => Some(Self::Skip),
            button_ids::STOP => Some(Self::Stop),
            button_ids::REPEAT => Some(Self::Repeat),
            button_ids::QUEUE => Some(Self::Queue),
            _ => None,
        }
    }
}

/// The controller's single button row.
pub fn control_row(repeat: RepeatMode) -> CreateActionRow {
    let repeat_style = if repeat == RepeatMode::Off {
        ButtonStyle::Secondary
    } else {
        ButtonStyle::Success
    };

    CreateActionRow::Buttons(vec![
        CreateButton::new(button_ids::PLAY_PAUSE)
            .emoji('⏯')
            .style(ButtonStyle::Primary),
        CreateButton::new(button_ids::SKIP)
            .emoji('⏭')
            .style(ButtonStyle::Secondary),
        CreateButton::new(button_ids::STOP)
            .emoji('⏹')
            .style(ButtonStyle::Danger),
        CreateButton::new(button_ids::REPEAT)
            .emoji('🔁')
            .style(repeat_style),
        CreateButton::new(button_ids::QUEUE)
            .emoji('📋')
            .style(ButtonStyle::Secondary),
    ])
}
