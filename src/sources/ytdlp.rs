use async_trait::async_trait;
use serde::Deserialize;
use serenity::model::id::UserId;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error, info};
use url::Url;

use crate::error::ResolveError;
use crate::session::Track;
use crate::sources::Resolver;

/// Resolver backed by the `yt-dlp` binary: URLs are extracted directly,
/// anything else becomes a YouTube search for the single best match.
pub struct YtDlpResolver;

impl YtDlpResolver {
    pub fn new() -> Self {
        Self
    }

    /// Verifies yt-dlp is on PATH; called once at startup.
    pub async fn check() -> anyhow::Result<()> {
        let output = Command::new("yt-dlp").arg("--version").output().await?;
        if !output.status.success() {
            anyhow::bail!("yt-dlp is not available; install it with `pip install yt-dlp`");
        }
        let version = String::from_utf8_lossy(&output.stdout);
        info!(version = version.trim(), "yt-dlp available");
        Ok(())
    }

    fn target_for(query: &str) -> String {
        if Url::parse(query).is_ok() {
            query.to_owned()
        } else {
            format!("ytsearch1:{query}")
        }
    }
}

impl Default for YtDlpResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Resolver for YtDlpResolver {
    async fn resolve(&self, query: &str, requested_by: UserId) -> Result<Track, ResolveError> {
        let target = Self::target_for(query);
        debug!(%target, "resolving via yt-dlp");

        let output = Command::new("yt-dlp")
            .args([
                "-j",
                "--no-playlist",
                "--no-warnings",
                "-f",
                "bestaudio/best",
            ])
            .arg(&target)
            .output()
            .await
            .map_err(|e| ResolveError::new(query, format!("failed to run yt-dlp: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr.lines().last().unwrap_or("yt-dlp failed").to_owned();
            error!(%query, %reason, "yt-dlp extraction failed");
            return Err(ResolveError::new(query, reason));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout
            .lines()
            .find(|l| !l.trim().is_empty())
            .ok_or_else(|| ResolveError::new(query, "no results"))?;

        parse_track(line, requested_by).map_err(|reason| ResolveError::new(query, reason))
    }
}

#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: String,
    /// Direct media URL for the selected format.
    url: Option<String>,
    webpage_url: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
}

fn parse_track(json: &str, requested_by: UserId) -> Result<Track, String> {
    let info: YtDlpInfo =
        serde_json::from_str(json).map_err(|e| format!("unexpected yt-dlp output: {e}"))?;

    let stream_url = info.url.ok_or("no playable format found")?;
    let page_url = info.webpage_url.unwrap_or_else(|| stream_url.clone());

    let mut track = Track::new(info.title, stream_url, page_url, requested_by);
    if let Some(secs) = info.duration {
        if secs.is_finite() && secs >= 0.0 {
            track = track.with_duration(Duration::from_secs_f64(secs));
        }
    }
    if let Some(thumbnail) = info.thumbnail {
        track = track.with_thumbnail(thumbnail);
    }
    Ok(track)
}
