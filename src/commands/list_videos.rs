use anyhow::{Context, Result};
use tracing::info;

use crate::summary::VideoSummary;
use crate::tiktok::{self, ClientConfig, TikTokClient};

/// List a user's videos without downloading them
pub async fn execute(handle: &str, json: bool, config: ClientConfig) -> Result<()> {
    let handle = tiktok::normalize_handle(handle)?;
    let count = config.post_count;

    let client = TikTokClient::new(config).context("Failed to initialize TikTok client")?;

    let posts = client
        .user_posts(&handle, count)
        .await
        .with_context(|| format!("Failed to list videos for @{handle}"))?;

    let summaries: Vec<VideoSummary> = posts
        .iter()
        .map(|post| VideoSummary::from_post(post, &handle))
        .collect();

    if json {
        // stdout carries only the JSON document
        let output = serde_json::to_string_pretty(&summaries)
            .context("Failed to serialize video summaries to JSON")?;
        println!("{output}");
        return Ok(());
    }

    if summaries.is_empty() {
        info!("No videos found for @{handle}");
        return Ok(());
    }

    println!("Found {} videos for @{handle}", summaries.len());
    println!("{:-^80}", "");

    for summary in &summaries {
        println!("ID: {id}", id = summary.id);
        println!("Title: {title}", title = summary.title);
        println!("Duration: {duration}", duration = summary.duration);
        println!("Posted: {timestamp}", timestamp = summary.timestamp);
        println!("URL: {url}", url = summary.url);
        println!("Thumbnail: {thumbnail}", thumbnail = summary.thumbnail);
        println!("{:-^80}", "");
    }

    Ok(())
}
