use anyhow::{bail, Result};
use sanitize_filename::sanitize;
use std::path::{Path, PathBuf};

/// File extension used for every downloaded video
pub const VIDEO_EXTENSION: &str = "mp4";

/// Utility functions for generating consistent filenames across the application
///
/// Generate a filename for a downloaded video
/// Format: videoid.mp4
pub fn video_filename(video_id: &str) -> String {
    format!("{video_id}.{VIDEO_EXTENSION}")
}

/// Full output path for a video identifier.
///
/// The identifier is used verbatim. One that is empty or would need rewriting
/// to be a safe file name (separators, reserved characters, `.`/`..`) is an error.
pub fn video_file_path(output_dir: &Path, video_id: &str) -> Result<PathBuf> {
    if video_id.is_empty() || sanitize(video_id) != video_id {
        bail!("Video identifier {video_id:?} cannot be used as a file name");
    }
    Ok(output_dir.join(video_filename(video_id)))
}
