use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use crate::error::{AppError, AppResult};

lazy_static! {
    static ref MEDIA_ID: Regex = Regex::new(r"^[A-Za-z0-9_-]{1,64}$").unwrap();
}

/// What a submitted link points at, derived from its query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    Video {
        video_id: String,
    },
    Playlist {
        playlist_id: String,
        video_id: Option<String>,
        /// 1-based position to highlight.
        index: usize,
    },
}

impl SourceRef {
    /// Classifies a raw URL. `list` wins over `v`; neither is invalid input.
    pub fn classify(raw: &str) -> AppResult<Self> {
        let parsed = Url::parse(raw.trim()).map_err(|_| AppError::invalid("Invalid YouTube URL"))?;

        let mut video_id = None;
        let mut playlist_id = None;
        let mut index = None;
        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "v" if video_id.is_none() && !value.is_empty() => video_id = Some(value.into_owned()),
                "list" if playlist_id.is_none() && !value.is_empty() => playlist_id = Some(value.into_owned()),
                "index" if index.is_none() => index = Some(value.into_owned()),
                _ => {}
            }
        }

        if let Some(playlist_id) = playlist_id {
            let index = index
                .and_then(|i| i.trim().parse::<usize>().ok())
                .filter(|i| *i >= 1)
                .unwrap_or(1);
            Ok(SourceRef::Playlist { playlist_id, video_id, index })
        } else if let Some(video_id) = video_id {
            Ok(SourceRef::Video { video_id })
        } else {
            Err(AppError::invalid("Invalid YouTube URL"))
        }
    }

    /// Canonical URL handed to the extractor.
    pub fn extractor_url(&self) -> String {
        match self {
            SourceRef::Video { video_id } => watch_url(video_id),
            SourceRef::Playlist { playlist_id, .. } => playlist_url(playlist_id),
        }
    }
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", urlencoding::encode(video_id))
}

pub fn playlist_url(playlist_id: &str) -> String {
    format!("https://www.youtube.com/playlist?list={}", urlencoding::encode(playlist_id))
}

/// Ids arriving on download routes end up in extractor arguments and file
/// paths, so only the YouTube id alphabet is accepted.
pub fn validate_media_id(id: &str) -> AppResult<&str> {
    if MEDIA_ID.is_match(id) {
        Ok(id)
    } else {
        Err(AppError::invalid(format!("Invalid video id: {:?}", id)))
    }
}
