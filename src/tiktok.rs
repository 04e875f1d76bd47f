use crate::error_utils::{
    create_http_client_with_context, parse_http_response_json, read_http_response_bytes,
};
use anyhow::{bail, Context, Result};
use regex::Regex;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

/// TikTok web API specific errors with structured information
#[derive(Debug, Error)]
pub enum TikTokError {
    #[error("Rate limited by TikTok (retry after: {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    #[error("User not found: {handle}")]
    UserNotFound { handle: String },

    #[error("Video not found: {video_id}")]
    VideoNotFound { video_id: String },

    #[error("Video {video_id} has no playable address")]
    MissingPlayAddress { video_id: String },

    #[error("Invalid handle {handle:?}: {reason}")]
    InvalidHandle { handle: String, reason: String },

    #[error("API error (status {status}): {message}")]
    ApiError { status: i64, message: String },
}

pub const TIKTOK_WEB_BASE: &str = "https://www.tiktok.com";

/// Default number of posts requested from the post list endpoint
pub const DEFAULT_POST_COUNT: u32 = 30;

const USER_DETAIL_PATH: &str = "api/user/detail/";
const POST_LIST_PATH: &str = "api/post/item_list/";
const ITEM_DETAIL_PATH: &str = "api/item/detail/";

// statusCode values the web API uses for missing resources
const USER_NOT_FOUND_STATUS: i64 = 10202;
const VIDEO_NOT_FOUND_STATUS: i64 = 10204;

/// A single post as returned by the web API
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub create_time: Option<i64>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub video: Option<Video>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    #[serde(default)]
    pub unique_id: String,
    #[serde(default)]
    pub nickname: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub play_addr: Option<String>,
    #[serde(default)]
    pub download_addr: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
}

impl Video {
    /// Preferred address for the raw video: the download address, else the play address
    pub fn best_address(&self) -> Option<&str> {
        [&self.download_addr, &self.play_addr]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|addr| !addr.is_empty())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub unique_id: String,
    #[serde(default)]
    pub nickname: Option<String>,
    pub sec_uid: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDetailResponse {
    user_info: Option<UserInfo>,
    #[serde(default)]
    status_code: i64,
    status_msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    user: User,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostListResponse {
    #[serde(default)]
    item_list: Option<Vec<Post>>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    status_code: i64,
    status_msg: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemDetailResponse {
    item_info: Option<ItemInfo>,
    #[serde(default)]
    status_code: i64,
    status_msg: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemInfo {
    item_struct: Post,
}

/// Accepts a number or a numeric string; the web API uses both for timestamps
fn deserialize_lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(i64),
        Text(String),
    }

    Ok(
        match Option::<NumberOrString>::deserialize(deserializer)? {
            Some(NumberOrString::Number(n)) => Some(n),
            Some(NumberOrString::Text(s)) => s.parse().ok(),
            None => None,
        },
    )
}

/// What an API request is about, used to name missing resources
#[derive(Debug, Clone, Copy)]
enum Resource<'a> {
    User(&'a str),
    Video(&'a str),
}

impl Resource<'_> {
    fn not_found(self) -> TikTokError {
        match self {
            Resource::User(handle) => TikTokError::UserNotFound {
                handle: handle.to_string(),
            },
            Resource::Video(video_id) => TikTokError::VideoNotFound {
                video_id: video_id.to_string(),
            },
        }
    }

    fn kind(self) -> &'static str {
        match self {
            Resource::User(_) => "user",
            Resource::Video(_) => "video",
        }
    }
}

/// Converts a non-zero `statusCode` into the matching error
fn check_api_status(
    status_code: i64,
    status_msg: Option<String>,
    resource: Resource<'_>,
) -> Result<()> {
    match status_code {
        0 => Ok(()),
        USER_NOT_FOUND_STATUS | VIDEO_NOT_FOUND_STATUS => Err(resource.not_found().into()),
        status => Err(TikTokError::ApiError {
            status,
            message: status_msg.unwrap_or_else(|| "no status message".to_string()),
        }
        .into()),
    }
}

/// Connection settings for the web API
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the web API
    pub api_base: String,
    /// Web session token, sent as the `msToken` cookie and query parameter
    pub ms_token: Option<String>,
    /// Number of posts requested when listing a user's posts
    pub post_count: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: TIKTOK_WEB_BASE.to_string(),
            ms_token: None,
            post_count: DEFAULT_POST_COUNT,
        }
    }
}

/// TikTok web API client for listing posts and downloading videos
pub struct TikTokClient {
    client: Client,
    api_base: Url,
    ms_token: Option<String>,
    post_count: u32,
}

impl TikTokClient {
    /// Creates a new client from the given configuration
    pub fn new(config: ClientConfig) -> Result<Self> {
        // A trailing slash keeps any path prefix when joining endpoint paths
        let mut base = config.api_base.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let api_base = Url::parse(&base)
            .with_context(|| format!("Invalid API base URL: {base}", base = config.api_base))?;

        let client = create_http_client_with_context(config.ms_token.as_deref())?;

        debug!("TikTok client using API base {api_base}");
        if config.ms_token.is_none() {
            debug!("No msToken configured, requests are unauthenticated");
        }

        Ok(Self {
            client,
            api_base,
            ms_token: config.ms_token,
            post_count: config.post_count,
        })
    }

    /// Number of posts requested by [`TikTokClient::user_posts`] through the video source
    pub fn post_count(&self) -> u32 {
        self.post_count
    }

    /// Builds an endpoint URL with query parameters and the session token
    fn endpoint_url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .api_base
            .join(path)
            .with_context(|| format!("Failed to build URL for {path}"))?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
            if let Some(token) = &self.ms_token {
                query.append_pair("msToken", token);
            }
        }
        Ok(url)
    }

    /// Makes a web API request and maps HTTP failures to structured errors
    async fn api_request(&self, resource: Resource<'_>, url: Url) -> Result<reqwest::Response> {
        debug!(resource = resource.kind(), %url, "Making request to TikTok API");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request to TikTok API")?;

        let status = response.status();
        if status.is_success() {
            debug!(resource = resource.kind(), %status, "Received TikTok API response");
            return Ok(response);
        }

        Err(match status {
            StatusCode::NOT_FOUND => resource.not_found(),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(header::RETRY_AFTER)
                    .and_then(|h| h.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok());
                TikTokError::RateLimited { retry_after }
            }
            _ => TikTokError::ApiError {
                status: i64::from(status.as_u16()),
                message: format!("HTTP {status}"),
            },
        }
        .into())
    }

    /// Get a user's profile from their handle
    pub async fn user_detail(&self, handle: &str) -> Result<User> {
        let url = self.endpoint_url(USER_DETAIL_PATH, &[("uniqueId", handle)])?;
        let resource = Resource::User(handle);

        let response = self.api_request(resource, url).await?;
        let detail: UserDetailResponse =
            parse_http_response_json(response, "TikTok user detail").await?;

        check_api_status(detail.status_code, detail.status_msg, resource)?;
        let user = detail
            .user_info
            .map(|info| info.user)
            .ok_or_else(|| resource.not_found())?;

        debug!(
            "Resolved @{handle} to user {id} (secUid {sec_uid})",
            id = user.id,
            sec_uid = user.sec_uid
        );
        Ok(user)
    }

    /// Lists a user's posts.
    ///
    /// Only the first page of the post list is requested; later pages are not followed.
    pub async fn user_posts(&self, handle: &str, count: u32) -> Result<Vec<Post>> {
        let user = self.user_detail(handle).await?;

        let count = count.to_string();
        let url = self.endpoint_url(
            POST_LIST_PATH,
            &[
                ("secUid", user.sec_uid.as_str()),
                ("count", count.as_str()),
                ("cursor", "0"),
            ],
        )?;
        let resource = Resource::User(handle);

        let response = self.api_request(resource, url).await?;
        let list: PostListResponse = parse_http_response_json(response, "TikTok post list").await?;
        check_api_status(list.status_code, list.status_msg, resource)?;

        let posts = list.item_list.unwrap_or_default();
        info!(
            "Found {posts_count} posts for @{handle}",
            posts_count = posts.len()
        );
        if list.has_more {
            warn!("@{handle} has more posts than the {count} requested; only the first page is used");
        }

        Ok(posts)
    }

    /// Retrieves a single post by its video ID
    pub async fn video_detail(&self, video_id: &str) -> Result<Post> {
        let url = self.endpoint_url(ITEM_DETAIL_PATH, &[("itemId", video_id)])?;
        let resource = Resource::Video(video_id);

        let response = self.api_request(resource, url).await?;
        let detail: ItemDetailResponse =
            parse_http_response_json(response, "TikTok item detail").await?;

        check_api_status(detail.status_code, detail.status_msg, resource)?;
        detail
            .item_info
            .map(|info| info.item_struct)
            .ok_or_else(|| resource.not_found().into())
    }

    /// Downloads the full video payload for a video ID
    pub async fn video_bytes(&self, video_id: &str) -> Result<Vec<u8>> {
        let post = self.video_detail(video_id).await?;
        let address = post
            .video
            .as_ref()
            .and_then(Video::best_address)
            .ok_or_else(|| TikTokError::MissingPlayAddress {
                video_id: video_id.to_string(),
            })?;

        info!("Downloading video {video_id}");
        debug!("Video {video_id} address: {address}");

        let response = self
            .client
            .get(address)
            .header(header::ACCEPT, "video/mp4,video/webm,video/*;q=0.8,*/*;q=0.5")
            .header(header::REFERER, format!("{TIKTOK_WEB_BASE}/"))
            .send()
            .await
            .with_context(|| format!("Failed to request video {video_id}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status {
                StatusCode::NOT_FOUND => Resource::Video(video_id).not_found(),
                _ => TikTokError::ApiError {
                    status: i64::from(status.as_u16()),
                    message: format!("Failed to download video {video_id} from {address}"),
                },
            }
            .into());
        }

        let bytes = read_http_response_bytes(response, "video").await?;
        debug!(
            "Downloaded {len} bytes for video {video_id}",
            len = bytes.len()
        );
        Ok(bytes)
    }
}

/// Strips a leading `@` and checks the handle only uses characters TikTok allows
pub fn normalize_handle(handle: &str) -> Result<String, TikTokError> {
    let trimmed = handle.trim();
    let stripped = trimmed.strip_prefix('@').unwrap_or(trimmed);

    if stripped.is_empty() {
        return Err(TikTokError::InvalidHandle {
            handle: handle.to_string(),
            reason: "handle cannot be empty".to_string(),
        });
    }

    if !stripped
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
    {
        return Err(TikTokError::InvalidHandle {
            handle: handle.to_string(),
            reason: "only letters, digits, underscores and dots are allowed".to_string(),
        });
    }

    Ok(stripped.to_string())
}

/// `tiktok.com` itself or one of its subdomains
fn is_tiktok_host(host: &str) -> bool {
    host == "tiktok.com" || host.ends_with(".tiktok.com")
}

/// Extracts a video ID from a URL or returns the ID if it's already an ID
pub fn parse_video_id(url_or_id: &str) -> Result<String> {
    if url_or_id.is_empty() {
        bail!("Video ID cannot be empty");
    }

    if url_or_id.chars().all(|c| c.is_ascii_digit()) {
        return Ok(url_or_id.to_string());
    }

    match Url::parse(url_or_id) {
        Ok(parsed_url) => {
            if parsed_url.host_str().is_some_and(is_tiktok_host) {
                // Path format should be /@username/video/video_id
                let path_segments: Vec<&str> = parsed_url
                    .path_segments()
                    .map_or(Vec::new(), |s| s.collect());

                if path_segments.len() >= 3
                    && path_segments[0].starts_with('@')
                    && path_segments[1] == "video"
                    && !path_segments[2].is_empty()
                    && path_segments[2].chars().all(|c| c.is_ascii_digit())
                {
                    return Ok(path_segments[2].to_string());
                }
            }
        }
        Err(_) => {
            // URLs without a scheme, e.g. `www.tiktok.com/@user/video/123`
            let re = Regex::new(r"^(?:[\w-]+\.)*tiktok\.com/@[\w.]+/video/(\d+)")
                .context("Failed to compile video ID regex")?;
            if let Some(id_match) = re.captures(url_or_id).and_then(|c| c.get(1)) {
                return Ok(id_match.as_str().to_string());
            }
        }
    }

    bail!("Could not extract video ID from: {url_or_id}")
}
