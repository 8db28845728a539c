use serde::Deserialize;

/// Subset of `yt-dlp --dump-single-json` for a single video.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub id: String,
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub thumbnails: Vec<Thumbnail>,
    #[serde(default)]
    pub formats: Vec<RawFormat>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFormat {
    pub format_id: String,
    pub ext: Option<String>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub height: Option<u32>,
    pub format_note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    pub preference: Option<i64>,
    pub height: Option<u32>,
}

/// `yt-dlp --flat-playlist --dump-single-json` output.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistInfo {
    pub title: Option<String>,
    #[serde(default)]
    pub entries: Vec<RawEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawEntry {
    pub id: Option<String>,
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub thumbnails: Vec<Thumbnail>,
}

fn best_thumbnail(thumbnails: &[Thumbnail]) -> Option<&str> {
    // yt-dlp lists thumbnails worst first
    thumbnails
        .iter()
        .enumerate()
        .max_by_key(|(pos, t)| (t.preference.unwrap_or(i64::MIN), t.height.unwrap_or(0), *pos))
        .map(|(_, t)| t.url.as_str())
}

impl VideoInfo {
    pub fn title(&self) -> &str {
        self.title.as_deref().filter(|t| !t.trim().is_empty()).unwrap_or(self.id.as_str())
    }

    pub fn thumbnail_url(&self) -> Option<&str> {
        self.thumbnail
            .as_deref()
            .filter(|t| !t.is_empty())
            .or_else(|| best_thumbnail(&self.thumbnails))
    }

    /// Progressive formats (audio and video in one stream), in extractor order.
    pub fn progressive_formats(&self) -> Vec<FormatDescriptor> {
        self.formats
            .iter()
            .map(FormatDescriptor::from)
            .filter(|f| f.progressive)
            .collect()
    }
}

impl RawEntry {
    pub fn thumbnail_url(&self) -> Option<&str> {
        self.thumbnail
            .as_deref()
            .filter(|t| !t.is_empty())
            .or_else(|| best_thumbnail(&self.thumbnails))
    }
}

fn has_codec(codec: Option<&str>) -> bool {
    matches!(codec, Some(value) if !value.is_empty() && value != "none")
}

/// A downloadable format as presented to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatDescriptor {
    pub format_id: String,
    pub height: u32,
    /// `"720p"`, or the extractor's note when the height is unknown.
    pub resolution: String,
    pub container: String,
    pub progressive: bool,
}

impl From<&RawFormat> for FormatDescriptor {
    fn from(raw: &RawFormat) -> Self {
        let height = raw.height.unwrap_or(0);
        let resolution = match raw.height {
            Some(h) if h > 0 => format!("{}p", h),
            _ => raw.format_note.clone().unwrap_or_else(|| raw.format_id.clone()),
        };
        FormatDescriptor {
            format_id: raw.format_id.clone(),
            height,
            resolution,
            container: raw.ext.clone().unwrap_or_default(),
            progressive: has_codec(raw.vcodec.as_deref()) && has_codec(raw.acodec.as_deref()),
        }
    }
}

/// One row of the playlist page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub position: usize,
    pub title: String,
    pub thumbnail_url: Option<String>,
    pub video_id: String,
    pub highlighted: bool,
}
