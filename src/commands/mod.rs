pub mod download;
pub mod fetch_video;
pub mod list_videos;
