use crate::datetime_utils::{format_duration, format_for_display, from_unix_timestamp};
use crate::tiktok::{Post, TIKTOK_WEB_BASE};
use serde::Serialize;

const UNTITLED: &str = "Untitled";
const UNKNOWN_TIMESTAMP: &str = "Unknown";

/// Display record for one of a user's videos
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VideoSummary {
    pub id: String,
    pub title: String,
    pub url: String,
    pub thumbnail: String,
    pub duration: String,
    pub timestamp: String,
}

impl VideoSummary {
    /// Builds the display record for a post published by `handle`
    pub fn from_post(post: &Post, handle: &str) -> Self {
        let title = post
            .desc
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(UNTITLED)
            .to_string();

        let video = post.video.as_ref();
        let thumbnail = video
            .and_then(|v| v.cover.clone())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| fallback_thumbnail(&post.id));
        let duration = format_duration(video.and_then(|v| v.duration).unwrap_or(0));

        let timestamp = post
            .create_time
            .map(|t| format_for_display(&from_unix_timestamp(t)))
            .unwrap_or_else(|| UNKNOWN_TIMESTAMP.to_string());

        Self {
            id: post.id.clone(),
            title,
            url: video_page_url(handle, &post.id),
            thumbnail,
            duration,
            timestamp,
        }
    }
}

/// Public page for a video
pub fn video_page_url(handle: &str, video_id: &str) -> String {
    format!("{TIKTOK_WEB_BASE}/@{handle}/video/{video_id}")
}

/// CDN cover image used when a post carries no cover of its own
fn fallback_thumbnail(video_id: &str) -> String {
    format!("https://p16-sign.tiktokcdn.com/tos-maliva-p-0068/{video_id}~tplv-obj2:1080:1080:0:0.webp")
}
