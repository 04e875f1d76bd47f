use crate::filename_utils::video_file_path;
use crate::source::VideoSource;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Result of saving every video for a handle
#[derive(Debug, Default)]
pub struct SaveSummary {
    /// Paths written, in the order the posts were listed
    pub files: Vec<PathBuf>,
}

/// Writes a video payload to `<video_id>.mp4`, replacing any existing file
pub async fn save_video(output_dir: &Path, video_id: &str, payload: &[u8]) -> Result<PathBuf> {
    let file_path = video_file_path(output_dir, video_id)?;

    tokio::fs::write(&file_path, payload)
        .await
        .with_context(|| {
            format!(
                "Failed to write video {video_id} to {path}",
                path = file_path.display()
            )
        })?;

    debug!(
        "Saved {len} bytes to {path}",
        len = payload.len(),
        path = file_path.display()
    );
    Ok(file_path)
}

/// Fetches a single video and saves it
pub async fn fetch_and_save<S: VideoSource + ?Sized>(
    source: &S,
    video_id: &str,
    output_dir: &Path,
) -> Result<PathBuf> {
    // The whole payload is in memory before the file is opened, so a failed
    // fetch never leaves a partial file behind
    let payload = source
        .fetch_video(video_id)
        .await
        .with_context(|| format!("Failed to fetch video {video_id}"))?;

    save_video(output_dir, video_id, &payload).await
}

/// Lists every post for `handle` and saves each video, in order.
///
/// The first failure stops the run; posts after it are not fetched.
pub async fn save_all_videos<S: VideoSource + ?Sized>(
    source: &S,
    handle: &str,
    output_dir: &Path,
) -> Result<SaveSummary> {
    let posts = source
        .list_posts(handle)
        .await
        .with_context(|| format!("Failed to list posts for {handle}"))?;

    if posts.is_empty() {
        info!("No posts found for {handle}");
        return Ok(SaveSummary::default());
    }

    let total = posts.len();
    let mut summary = SaveSummary::default();

    for (index, post) in posts.iter().enumerate() {
        info!(
            "Fetching video {video_id} ({position}/{total})",
            video_id = post.id,
            position = index + 1
        );
        let path = fetch_and_save(source, &post.id, output_dir).await?;
        summary.files.push(path);
    }

    info!(
        "Saved {count} videos for {handle} in {path}",
        count = summary.files.len(),
        path = output_dir.display()
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiktok::Post;
    use anyhow::bail;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// In-memory source that records every fetch
    struct FakeSource {
        posts: Vec<Post>,
        payloads: HashMap<String, Vec<u8>>,
        failing_id: Option<String>,
        fetched: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn new(entries: &[(&str, &[u8])]) -> Self {
            Self {
                posts: entries
                    .iter()
                    .map(|(id, _)| Post {
                        id: id.to_string(),
                        ..Post::default()
                    })
                    .collect(),
                payloads: entries
                    .iter()
                    .map(|(id, payload)| (id.to_string(), payload.to_vec()))
                    .collect(),
                failing_id: None,
                fetched: Mutex::new(Vec::new()),
            }
        }

        fn failing_on(mut self, video_id: &str) -> Self {
            self.failing_id = Some(video_id.to_string());
            self
        }

        fn fetched(&self) -> Vec<String> {
            self.fetched.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl VideoSource for FakeSource {
        async fn list_posts(&self, _handle: &str) -> Result<Vec<Post>> {
            Ok(self.posts.clone())
        }

        async fn fetch_video(&self, video_id: &str) -> Result<Vec<u8>> {
            self.fetched.lock().unwrap().push(video_id.to_string());
            if self.failing_id.as_deref() == Some(video_id) {
                bail!("connection reset while fetching {video_id}");
            }
            self.payloads
                .get(video_id)
                .cloned()
                .with_context(|| format!("no payload for {video_id}"))
        }
    }

    struct FailingList;

    #[async_trait]
    impl VideoSource for FailingList {
        async fn list_posts(&self, handle: &str) -> Result<Vec<Post>> {
            bail!("user {handle} is private")
        }

        async fn fetch_video(&self, _video_id: &str) -> Result<Vec<u8>> {
            unreachable!("no posts are listed")
        }
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_saves_each_post_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let source = FakeSource::new(&[("a1", b"AAA"), ("b2", b"BBB")]);

        let summary = save_all_videos(&source, "someone", temp_dir.path())
            .await
            .unwrap();

        assert_eq!(
            summary.files,
            vec![temp_dir.path().join("a1.mp4"), temp_dir.path().join("b2.mp4")]
        );
        assert_eq!(source.fetched(), vec!["a1", "b2"]);
        assert_eq!(std::fs::read(temp_dir.path().join("a1.mp4")).unwrap(), b"AAA");
        assert_eq!(std::fs::read(temp_dir.path().join("b2.mp4")).unwrap(), b"BBB");
        assert_eq!(file_names(temp_dir.path()), vec!["a1.mp4", "b2.mp4"]);
    }

    #[tokio::test]
    async fn test_one_file_per_post() {
        let temp_dir = TempDir::new().unwrap();
        let payloads: Vec<(String, Vec<u8>)> = (0..5)
            .map(|i| (format!("73000000000000000{i}"), vec![i as u8; 64 * (i + 1)]))
            .collect();
        let entries: Vec<(&str, &[u8])> = payloads
            .iter()
            .map(|(id, payload)| (id.as_str(), payload.as_slice()))
            .collect();
        let source = FakeSource::new(&entries);

        let summary = save_all_videos(&source, "someone", temp_dir.path())
            .await
            .unwrap();

        assert_eq!(summary.files.len(), 5);
        assert_eq!(file_names(temp_dir.path()).len(), 5);
        for (id, payload) in &payloads {
            let written = std::fs::read(temp_dir.path().join(format!("{id}.mp4"))).unwrap();
            assert_eq!(&written, payload);
        }
    }

    #[tokio::test]
    async fn test_empty_post_list_creates_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let source = FakeSource::new(&[]);

        let summary = save_all_videos(&source, "someone", temp_dir.path())
            .await
            .unwrap();

        assert!(summary.files.is_empty());
        assert!(file_names(temp_dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_failed_fetch_stops_the_run() {
        let temp_dir = TempDir::new().unwrap();
        let source =
            FakeSource::new(&[("a1", b"AAA"), ("b2", b"BBB"), ("c3", b"CCC")]).failing_on("b2");

        let err = save_all_videos(&source, "someone", temp_dir.path())
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("Failed to fetch video b2"));
        assert!(format!("{err:#}").contains("connection reset"));
        // Nothing after the failing post is fetched or written
        assert_eq!(source.fetched(), vec!["a1", "b2"]);
        assert_eq!(file_names(temp_dir.path()), vec!["a1.mp4"]);
        assert!(!temp_dir.path().join("b2.mp4").exists());
    }

    #[tokio::test]
    async fn test_list_failure_propagates() {
        let temp_dir = TempDir::new().unwrap();

        let err = save_all_videos(&FailingList, "hidden", temp_dir.path())
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("Failed to list posts for hidden"));
        assert!(file_names(temp_dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_rerun_overwrites_existing_files() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a1.mp4"), b"stale and much longer").unwrap();

        let source = FakeSource::new(&[("a1", b"AAA")]);
        save_all_videos(&source, "someone", temp_dir.path())
            .await
            .unwrap();

        assert_eq!(std::fs::read(temp_dir.path().join("a1.mp4")).unwrap(), b"AAA");
    }

    #[tokio::test]
    async fn test_write_failure_propagates() {
        let temp_dir = TempDir::new().unwrap();
        let missing_dir = temp_dir.path().join("does-not-exist");

        let err = save_video(&missing_dir, "a1", b"AAA").await.unwrap_err();
        assert!(err.to_string().contains("Failed to write video a1"));
    }

    #[tokio::test]
    async fn test_unsafe_identifier_is_rejected_not_rewritten() {
        let temp_dir = TempDir::new().unwrap();

        let err = save_video(temp_dir.path(), "a:b", b"X").await.unwrap_err();
        assert!(err.to_string().contains("cannot be used as a file name"));
        assert!(file_names(temp_dir.path()).is_empty());

        save_video(temp_dir.path(), "ab", b"Y").await.unwrap();
        assert_eq!(file_names(temp_dir.path()), vec!["ab.mp4"]);
        assert_eq!(std::fs::read(temp_dir.path().join("ab.mp4")).unwrap(), b"Y");
    }

    #[tokio::test]
    async fn test_unsafe_identifier_stops_the_run() {
        let temp_dir = TempDir::new().unwrap();
        let source = FakeSource::new(&[("ab", b"AAA"), ("a:b", b"BBB"), ("c3", b"CCC")]);

        let err = save_all_videos(&source, "someone", temp_dir.path())
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("\"a:b\" cannot be used as a file name"));
        assert_eq!(source.fetched(), vec!["ab", "a:b"]);
        assert_eq!(file_names(temp_dir.path()), vec!["ab.mp4"]);
        assert_eq!(std::fs::read(temp_dir.path().join("ab.mp4")).unwrap(), b"AAA");
    }

    #[tokio::test]
    async fn test_fetch_and_save_single_video() {
        let temp_dir = TempDir::new().unwrap();
        let source = FakeSource::new(&[("a1", b"AAA"), ("b2", b"BBB")]);

        let path = fetch_and_save(&source, "b2", temp_dir.path()).await.unwrap();

        assert_eq!(path, temp_dir.path().join("b2.mp4"));
        assert_eq!(source.fetched(), vec!["b2"]);
        assert_eq!(file_names(temp_dir.path()), vec!["b2.mp4"]);
    }
}
