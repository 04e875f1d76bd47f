use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

use crate::archive;
use crate::tiktok::{ClientConfig, TikTokClient};

/// Handle used when none is given on the command line
pub const DEFAULT_HANDLE: &str = "tiktok_username";

/// Download every video posted by a user
///
/// # Arguments
/// * `handle` - Account handle, passed to the API as given
/// * `output_dir` - Directory the `<id>.mp4` files are written to
/// * `config` - Web API connection settings
pub async fn execute(handle: &str, output_dir: &Path, config: ClientConfig) -> Result<()> {
    info!("Downloading videos for {handle}");

    let client = TikTokClient::new(config).context("Failed to initialize TikTok client")?;

    let summary = archive::save_all_videos(&client, handle, output_dir).await?;

    for path in &summary.files {
        debug!("Downloaded {path}", path = path.display());
    }

    Ok(())
}
