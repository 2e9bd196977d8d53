use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    /// Set for development: commands register per-guild (fast propagation)
    /// instead of globally.
    pub guild_id: Option<u64>,

    // Playback
    /// Seconds an empty session lingers before it disconnects.
    pub idle_timeout_secs: u64,
    pub default_volume: f32,

    // Paths
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            discord_token: std::env::var("DISCORD_TOKEN")?,
            guild_id: std::env::var("GUILD_ID").ok().and_then(|s| s.parse().ok()),

            idle_timeout_secs: std::env::var("IDLE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()?,
            default_volume: std::env::var("DEFAULT_VOLUME")
                .unwrap_or_else(|_| "0.5".to_string())
                .parse()?,

            data_dir: std::env::var("DATA_DIR")
                .unwrap_or_else(|_| "./data".to_string())
                .into(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.discord_token.is_empty() {
            anyhow::bail!("DISCORD_TOKEN must not be empty");
        }
        if self.idle_timeout_secs == 0 {
            anyhow::bail!("IDLE_TIMEOUT_SECS must be positive");
        }
        if !(0.0..=2.0).contains(&self.default_volume) {
            anyhow::bail!(
                "DEFAULT_VOLUME must be between 0.0 and 2.0, got {}",
                self.default_volume
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> Config {
        Config {
            discord_token: "token".to_owned(),
            guild_id: None,
            idle_timeout_secs: 300,
            default_volume: 0.5,
            data_dir: "./data".into(),
        }
    }

    #[test]
    fn token_and_playback_defaults_validate() {
        assert!(config().validate().is_ok());
        assert_eq!(config().idle_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn empty_token_is_rejected() {
        let mut cfg = config();
        cfg.discord_token.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn out_of_range_volume_is_rejected() {
        let mut cfg = config();
        cfg.default_volume = 2.5;
        assert!(cfg.validate().is_err());
    }
}
