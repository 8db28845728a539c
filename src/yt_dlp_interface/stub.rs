//! In-process extractor used by tests.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use url::Url;

use crate::yt_dlp_interface::extractor::Extractor;
use crate::yt_dlp_interface::models::{PlaylistInfo, RawEntry, RawFormat, VideoInfo};
use crate::yt_dlp_interface::options::DownloadOptions;

#[derive(Default)]
pub struct StubExtractor {
    videos: HashMap<String, VideoInfo>,
    playlists: HashMap<String, PlaylistInfo>,
    broken_downloads: HashSet<String>,
}

fn query_param(url: &str, key: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// `(format_id, height, progressive, ext)`
pub type StubFormat<'a> = (&'a str, u32, bool, &'a str);

impl StubExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_video(mut self, id: &str, title: &str, thumbnail: Option<&str>, formats: &[StubFormat<'_>]) -> Self {
        let formats = formats
            .iter()
            .map(|(format_id, height, progressive, ext)| RawFormat {
                format_id: format_id.to_string(),
                ext: Some(ext.to_string()),
                vcodec: Some("avc1.64001F".to_string()),
                acodec: Some(if *progressive { "mp4a.40.2" } else { "none" }.to_string()),
                height: Some(*height),
                format_note: None,
            })
            .collect();
        self.videos.insert(
            id.to_string(),
            VideoInfo {
                id: id.to_string(),
                title: Some(title.to_string()),
                thumbnail: thumbnail.map(str::to_string),
                thumbnails: Vec::new(),
                formats,
            },
        );
        self
    }

    pub fn with_playlist(mut self, id: &str, title: &str, entries: &[(&str, &str)]) -> Self {
        let entries = entries
            .iter()
            .map(|(video_id, entry_title)| RawEntry {
                id: Some(video_id.to_string()),
                title: Some(entry_title.to_string()),
                thumbnail: Some(format!("https://img.example/{}.jpg", video_id)),
                thumbnails: Vec::new(),
            })
            .collect();
        self.playlists.insert(id.to_string(), PlaylistInfo { title: Some(title.to_string()), entries });
        self
    }

    /// Metadata still resolves, but downloading this id fails.
    pub fn with_broken_download(mut self, id: &str) -> Self {
        self.broken_downloads.insert(id.to_string());
        self
    }
}

#[async_trait]
impl Extractor for StubExtractor {
    async fn fetch_video(&self, url: &str) -> Result<VideoInfo> {
        let id = query_param(url, "v").ok_or_else(|| anyhow::anyhow!("Unsupported URL: {}", url))?;
        self.videos
            .get(&id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Video unavailable"))
    }

    async fn fetch_playlist(&self, url: &str) -> Result<PlaylistInfo> {
        let id = query_param(url, "list").ok_or_else(|| anyhow::anyhow!("Unsupported URL: {}", url))?;
        self.playlists
            .get(&id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("The playlist does not exist"))
    }

    async fn download(&self, url: &str, options: &DownloadOptions) -> Result<PathBuf> {
        let id = query_param(url, "v").ok_or_else(|| anyhow::anyhow!("Unsupported URL: {}", url))?;
        if self.broken_downloads.contains(&id) || !self.videos.contains_key(&id) {
            return Err(anyhow::anyhow!("HTTP Error 403: Forbidden"));
        }
        let path = options
            .output_dir
            .join(format!("{}.{}", options.filename_stem, options.container.extension()));
        tokio::fs::write(&path, format!("{}|{}", id, options.format_selector())).await?;
        Ok(path)
    }
}
