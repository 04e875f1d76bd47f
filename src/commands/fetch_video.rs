use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::archive;
use crate::tiktok::{self, ClientConfig, TikTokClient};

/// Download a single video by URL or ID
pub async fn execute(video_url_or_id: &str, output_dir: &Path, config: ClientConfig) -> Result<()> {
    let video_id = tiktok::parse_video_id(video_url_or_id).context("Failed to parse video ID")?;

    let client = TikTokClient::new(config).context("Failed to initialize TikTok client")?;

    let path = archive::fetch_and_save(&client, &video_id, output_dir).await?;

    info!("Saved video {video_id} to {path}", path = path.display());
    Ok(())
}
