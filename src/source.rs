use anyhow::Result;
use async_trait::async_trait;

use crate::tiktok::{Post, TikTokClient};

/// Where posts and their video payloads come from
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Lists the posts published by `handle`
    async fn list_posts(&self, handle: &str) -> Result<Vec<Post>>;

    /// Fetches the complete video payload for a post identifier
    async fn fetch_video(&self, video_id: &str) -> Result<Vec<u8>>;
}

#[async_trait]
impl VideoSource for TikTokClient {
    async fn list_posts(&self, handle: &str) -> Result<Vec<Post>> {
        self.user_posts(handle, self.post_count()).await
    }

    async fn fetch_video(&self, video_id: &str) -> Result<Vec<u8>> {
        self.video_bytes(video_id).await
    }
}
