pub mod archive;
pub mod commands;
pub mod datetime_utils;
pub mod error_utils;
pub mod filename_utils;
pub mod source;
pub mod summary;
pub mod tiktok;
