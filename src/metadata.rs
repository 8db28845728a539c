use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::source::SourceRef;
use crate::yt_dlp_interface::{Container, Extractor, FormatDescriptor, PlaylistEntry, VideoInfo};

pub const HIGHEST: &str = "highest";

/// A resolution request from the download route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Highest,
    Label(String),
}

impl Resolution {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Resolution::Highest,
            Some(value) if value.eq_ignore_ascii_case(HIGHEST) => Resolution::Highest,
            Some(value) => Resolution::Label(value.to_string()),
        }
    }
}

/// Progressive formats in `container`, highest first. The sort is stable, so
/// equal heights keep the extractor's order.
pub fn deliverable_formats(info: &VideoInfo, container: Container) -> Vec<FormatDescriptor> {
    let mut formats: Vec<FormatDescriptor> = info
        .progressive_formats()
        .into_iter()
        .filter(|f| f.container.eq_ignore_ascii_case(container.extension()))
        .collect();
    formats.sort_by(|a, b| b.height.cmp(&a.height));
    formats
}

/// `formats` must come from [`deliverable_formats`].
pub fn select_format<'a>(formats: &'a [FormatDescriptor], resolution: &Resolution) -> Option<&'a FormatDescriptor> {
    match resolution {
        Resolution::Highest => formats.first(),
        Resolution::Label(label) => formats.iter().find(|f| f.resolution == *label),
    }
}

pub fn resolution_labels(formats: &[FormatDescriptor]) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for format in formats {
        if !labels.contains(&format.resolution) {
            labels.push(format.resolution.clone());
        }
    }
    labels
}

#[derive(Debug, Clone)]
pub struct VideoPage {
    pub video_id: String,
    pub title: String,
    pub thumbnail_url: Option<String>,
    pub resolutions: Vec<String>,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct PlaylistPage {
    pub playlist_title: String,
    pub entries: Vec<PlaylistEntry>,
    pub url: String,
}

#[derive(Debug, Clone)]
pub enum PageModel {
    Video(VideoPage),
    Playlist(PlaylistPage),
}

pub struct MetadataFetcher {
    extractor: Arc<dyn Extractor>,
}

impl MetadataFetcher {
    pub fn new(extractor: Arc<dyn Extractor>) -> Self {
        Self { extractor }
    }

    pub async fn video(&self, video_id: &str) -> AppResult<VideoInfo> {
        let url = SourceRef::Video { video_id: video_id.to_string() }.extractor_url();
        self.extractor
            .fetch_video(&url)
            .await
            .map_err(|e| AppError::extractor("Error fetching video", e))
    }

    /// Fetches what the selection page needs for `source`. `submitted` is the
    /// URL as the user typed it, echoed back into the form.
    pub async fn fetch(&self, source: &SourceRef, submitted: &str) -> AppResult<PageModel> {
        match source {
            SourceRef::Video { video_id } => {
                let info = self.video(video_id).await?;
                let formats = deliverable_formats(&info, Container::Mp4);
                log::info!("Video {} has {} deliverable formats", video_id, formats.len());
                Ok(PageModel::Video(VideoPage {
                    video_id: video_id.clone(),
                    title: info.title().to_string(),
                    thumbnail_url: info.thumbnail_url().map(str::to_string),
                    resolutions: resolution_labels(&formats),
                    url: submitted.to_string(),
                }))
            }
            SourceRef::Playlist { playlist_id, index, .. } => {
                let info = self
                    .extractor
                    .fetch_playlist(&source.extractor_url())
                    .await
                    .map_err(|e| AppError::extractor("Error fetching playlist", e))?;

                let entries: Vec<PlaylistEntry> = info
                    .entries
                    .iter()
                    .enumerate()
                    .filter_map(|(pos, entry)| {
                        let position = pos + 1;
                        let video_id = entry.id.clone().filter(|id| !id.is_empty())?;
                        Some(PlaylistEntry {
                            position,
                            title: entry.title.clone().unwrap_or_else(|| video_id.clone()),
                            thumbnail_url: entry.thumbnail_url().map(str::to_string),
                            video_id,
                            highlighted: position == *index,
                        })
                    })
                    .collect();

                if entries.is_empty() {
                    return Err(AppError::extractor(
                        "Error fetching playlist",
                        anyhow::anyhow!("playlist {} has no available videos", playlist_id),
                    ));
                }
                log::info!("Playlist {} has {} entries", playlist_id, entries.len());

                Ok(PageModel::Playlist(PlaylistPage {
                    playlist_title: info.title.clone().unwrap_or_else(|| playlist_id.clone()),
                    entries,
                    url: submitted.to_string(),
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yt_dlp_interface::stub::StubExtractor;

    fn stub() -> Arc<dyn Extractor> {
        Arc::new(
            StubExtractor::new()
                .with_video(
                    "vid1",
                    "Clip",
                    Some("https://img.example/vid1.jpg"),
                    &[
                        ("18", 360, true, "mp4"),
                        ("137", 1080, false, "mp4"),
                        ("22", 720, true, "mp4"),
                        ("43", 720, true, "webm"),
                        ("59", 720, true, "mp4"),
                    ],
                )
                .with_video("bare", "Audio only", None, &[("140", 0, false, "m4a")])
                .with_playlist("PL1", "Mix", &[("a1", "One"), ("b2", "Two"), ("c3", "Three")])
                .with_playlist("PLempty", "Nothing", &[]),
        )
    }

    #[test]
    fn test_resolution_parse() {
        assert_eq!(Resolution::parse(None), Resolution::Highest);
        assert_eq!(Resolution::parse(Some("highest")), Resolution::Highest);
        assert_eq!(Resolution::parse(Some("")), Resolution::Highest);
        assert_eq!(Resolution::parse(Some("720p")), Resolution::Label("720p".into()));
    }

    #[tokio::test]
    async fn test_highest_picks_max_height_first_in_extractor_order() {
        let fetcher = MetadataFetcher::new(stub());
        let info = fetcher.video("vid1").await.unwrap();
        let formats = deliverable_formats(&info, Container::Mp4);

        let ids: Vec<_> = formats.iter().map(|f| f.format_id.as_str()).collect();
        assert_eq!(ids, vec!["22", "59", "18"]);
        assert_eq!(select_format(&formats, &Resolution::Highest).unwrap().format_id, "22");
        assert_eq!(select_format(&formats, &Resolution::Label("360p".into())).unwrap().format_id, "18");
        assert!(select_format(&formats, &Resolution::Label("1080p".into())).is_none());
        assert_eq!(resolution_labels(&formats), vec!["720p", "360p"]);
    }

    #[tokio::test]
    async fn test_fetch_video_page() {
        let fetcher = MetadataFetcher::new(stub());
        let source = SourceRef::Video { video_id: "vid1".into() };
        match fetcher.fetch(&source, "https://www.youtube.com/watch?v=vid1").await.unwrap() {
            PageModel::Video(page) => {
                assert_eq!(page.title, "Clip");
                assert_eq!(page.resolutions, vec!["720p", "360p"]);
                assert_eq!(page.thumbnail_url.as_deref(), Some("https://img.example/vid1.jpg"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_playlist_highlights_index() {
        let fetcher = MetadataFetcher::new(stub());
        let source = SourceRef::Playlist { playlist_id: "PL1".into(), video_id: None, index: 2 };
        match fetcher.fetch(&source, "https://www.youtube.com/playlist?list=PL1&index=2").await.unwrap() {
            PageModel::Playlist(page) => {
                assert_eq!(page.playlist_title, "Mix");
                let highlighted: Vec<_> = page.entries.iter().filter(|e| e.highlighted).map(|e| e.position).collect();
                assert_eq!(highlighted, vec![2]);
                assert_eq!(page.entries[1].video_id, "b2");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_extractor_failures_surface_as_messages() {
        let fetcher = MetadataFetcher::new(stub());

        let err = fetcher.fetch(&SourceRef::Video { video_id: "gone".into() }, "u").await.unwrap_err();
        assert_eq!(err.to_string(), "Error fetching video: Video unavailable");

        let empty = SourceRef::Playlist { playlist_id: "PLempty".into(), video_id: None, index: 1 };
        let err = fetcher.fetch(&empty, "u").await.unwrap_err();
        assert!(err.to_string().starts_with("Error fetching playlist"));
    }
}
