use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, COOKIE, USER_AGENT};
use serde::de::DeserializeOwned;

/// Browser identity sent with every platform request
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:139.0) Gecko/20100101 Firefox/139.0";

/// HTTP request error handling utilities
///
/// Parse HTTP response as JSON with contextual error handling
pub async fn parse_http_response_json<T: DeserializeOwned>(
    response: reqwest::Response,
    api_desc: &str,
) -> Result<T> {
    response
        .json::<T>()
        .await
        .with_context(|| format!("Failed to parse {api_desc} response"))
}

/// Read a full HTTP response body with contextual error handling
pub async fn read_http_response_bytes(response: reqwest::Response, desc: &str) -> Result<Vec<u8>> {
    let bytes = response
        .bytes()
        .await
        .with_context(|| format!("Failed to read {desc} body"))?;
    Ok(bytes.to_vec())
}

/// Create the platform HTTP client with browser-like default headers.
///
/// When a session token is supplied it rides along as the `msToken` cookie.
pub fn create_http_client_with_context(ms_token: Option<&str>) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

    if let Some(token) = ms_token {
        let cookie = HeaderValue::from_str(&format!("msToken={token}"))
            .context("Session token contains characters not allowed in a cookie")?;
        headers.insert(COOKIE, cookie);
    }

    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .context("Failed to create HTTP client")
}
