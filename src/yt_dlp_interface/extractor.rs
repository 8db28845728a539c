use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;

use crate::yt_dlp_interface::models::{PlaylistInfo, VideoInfo};
use crate::yt_dlp_interface::options::DownloadOptions;

/// The media-extraction collaborator. Metadata calls never download; a
/// download returns the path of the finished file.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn fetch_video(&self, url: &str) -> Result<VideoInfo>;

    async fn fetch_playlist(&self, url: &str) -> Result<PlaylistInfo>;

    async fn download(&self, url: &str, options: &DownloadOptions) -> Result<PathBuf>;
}
