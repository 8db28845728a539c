use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;

use crate::archive::{ArchiveMember, build_zip};
use crate::error::{AppError, AppResult};
use crate::metadata::{Resolution, deliverable_formats, select_format};
use crate::source::{validate_media_id, watch_url};
use crate::utils::{ScopedReader, ScratchDir, disambiguate, sanitize_filename};
use crate::yt_dlp_interface::{Container, DownloadOptions, Extractor, VideoInfo, fetch_bytes};

const THUMBNAIL_MIME: &str = "image/jpeg";
const ZIP_MIME: &str = "application/zip";
const BATCH_ARCHIVE: &str = "playlist.zip";
// On-disk names inside a scratch or item directory. Titles only name the
// served file, never a path, since long multibyte titles exceed NAME_MAX.
const VIDEO_STEM: &str = "video";
const THUMBNAIL_FILE: &str = "thumbnail.jpg";

/// What a playlist batch should package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchAction {
    Videos,
    Thumbnails,
}

impl BatchAction {
    /// `videos` and `all_videos_zip` both mean videos; a missing action too.
    pub fn parse(raw: Option<&str>) -> AppResult<Self> {
        match raw.map(str::trim) {
            None | Some("") | Some("videos") | Some("all_videos_zip") => Ok(BatchAction::Videos),
            Some("thumbnails") => Ok(BatchAction::Thumbnails),
            Some(other) => Err(AppError::invalid(format!("Unknown playlist action: {:?}", other))),
        }
    }

    fn archive_name(&self) -> &'static str {
        match self {
            BatchAction::Videos => "playlist_videos.zip",
            BatchAction::Thumbnails => "playlist_thumbnails.zip",
        }
    }

    fn context(&self) -> &'static str {
        match self {
            BatchAction::Videos => "Error downloading playlist",
            BatchAction::Thumbnails => "Error downloading thumbnails",
        }
    }
}

pub enum ArtifactBody {
    Bytes(Bytes),
    /// File inside a scratch directory; the reader owns the directory.
    File { reader: ScopedReader<tokio::fs::File>, len: u64 },
}

/// A finished download, ready to be sent once.
pub struct Artifact {
    pub filename: String,
    pub content_type: &'static str,
    pub body: ArtifactBody,
}

impl Artifact {
    async fn from_file(path: &Path, scratch: ScratchDir, filename: String, content_type: &'static str) -> AppResult<Self> {
        let file = tokio::fs::File::open(path).await?;
        let len = file.metadata().await?.len();
        let reader = ScopedReader::new(file, scratch, len, filename.clone());
        Ok(Artifact { filename, content_type, body: ArtifactBody::File { reader, len } })
    }

    pub fn len(&self) -> u64 {
        match &self.body {
            ArtifactBody::Bytes(bytes) => bytes.len() as u64,
            ArtifactBody::File { len, .. } => *len,
        }
    }

    #[cfg(test)]
    pub async fn into_bytes(self) -> std::io::Result<Vec<u8>> {
        use tokio::io::AsyncReadExt;
        match self.body {
            ArtifactBody::Bytes(bytes) => Ok(bytes.to_vec()),
            ArtifactBody::File { mut reader, .. } => {
                let mut out = Vec::new();
                reader.read_to_end(&mut out).await?;
                Ok(out)
            }
        }
    }
}

/// Turns user selections into files: resolves formats, runs the extractor
/// inside a scratch directory and packages the result.
pub struct Orchestrator {
    extractor: Arc<dyn Extractor>,
    http: reqwest::Client,
    scratch_root: PathBuf,
}

impl Orchestrator {
    pub fn new(extractor: Arc<dyn Extractor>, http: reqwest::Client, scratch_root: PathBuf) -> Self {
        Self { extractor, http, scratch_root }
    }

    fn scratch(&self) -> AppResult<ScratchDir> {
        ScratchDir::new_in(&self.scratch_root).map_err(AppError::Internal)
    }

    async fn video_info(&self, video_id: &str, context: &str) -> AppResult<VideoInfo> {
        self.extractor
            .fetch_video(&watch_url(video_id))
            .await
            .map_err(|e| AppError::extractor(context, e))
    }

    /// Downloads format `format_id` of `video_id` into `dir`; returns the file and the
    /// sanitized title to serve it under.
    async fn fetch_video_file(
        &self,
        video_id: &str,
        info: &VideoInfo,
        format_id: &str,
        dir: &Path,
        context: &str,
    ) -> AppResult<(PathBuf, String)> {
        let options = DownloadOptions {
            format_id: format_id.to_string(),
            container: Container::Mp4,
            output_dir: dir.to_path_buf(),
            filename_stem: VIDEO_STEM.to_string(),
        };
        let path = self
            .extractor
            .download(&watch_url(video_id), &options)
            .await
            .map_err(|e| AppError::extractor(context, e))?;
        Ok((path, sanitize_filename(info.title())))
    }

    pub async fn download_video(&self, video_id: &str, resolution: &Resolution) -> AppResult<Artifact> {
        const CONTEXT: &str = "Error downloading video";
        let video_id = validate_media_id(video_id)?;
        let info = self.video_info(video_id, CONTEXT).await?;

        let formats = deliverable_formats(&info, Container::Mp4);
        let format = select_format(&formats, resolution)
            .ok_or_else(|| AppError::not_found("No stream found for this resolution"))?;
        log::info!("Video {}: serving format {} ({})", video_id, format.format_id, format.resolution);

        let scratch = self.scratch()?;
        let (path, stem) = self
            .fetch_video_file(video_id, &info, &format.format_id, scratch.path(), CONTEXT)
            .await?;

        let filename = format!("{}.{}", stem, Container::Mp4.extension());
        Artifact::from_file(&path, scratch, filename, Container::Mp4.mime_type()).await
    }

    pub async fn download_thumbnail(&self, video_id: &str) -> AppResult<Artifact> {
        const CONTEXT: &str = "Error downloading thumbnail";
        let video_id = validate_media_id(video_id)?;
        let info = self.video_info(video_id, CONTEXT).await?;
        let (bytes, filename) = self.fetch_thumbnail(&info, CONTEXT).await?;
        Ok(Artifact { filename, content_type: THUMBNAIL_MIME, body: ArtifactBody::Bytes(bytes) })
    }

    async fn fetch_thumbnail(&self, info: &VideoInfo, context: &str) -> AppResult<(Bytes, String)> {
        let url = info
            .thumbnail_url()
            .ok_or_else(|| AppError::not_found("No thumbnail found for this video"))?;
        let bytes = fetch_bytes(&self.http, url)
            .await
            .map_err(|e| AppError::extractor(context, e))?;
        Ok((bytes, format!("{}_thumbnail.jpg", sanitize_filename(info.title()))))
    }

    /// Downloads every selected id and zips whatever succeeded. Items that fail
    /// are logged and left out; no successes at all is a not-found.
    pub async fn download_playlist_batch(&self, video_ids: &[String], action: BatchAction) -> AppResult<Artifact> {
        let mut seen = HashSet::new();
        let mut ids: Vec<&str> = Vec::new();
        for id in video_ids {
            let id = validate_media_id(id.trim())?;
            if seen.insert(id) {
                ids.push(id);
            }
        }
        if ids.is_empty() {
            return Err(AppError::invalid("No videos selected"));
        }

        let scratch = self.scratch()?;
        let mut members = Vec::new();
        let mut taken = HashSet::new();

        for (n, id) in ids.iter().enumerate() {
            let item_dir = scratch.item_dir(n + 1).map_err(AppError::Internal)?;
            let result = match action {
                BatchAction::Videos => self.batch_video(id, &item_dir, action.context()).await,
                BatchAction::Thumbnails => self.batch_thumbnail(id, &item_dir, action.context()).await,
            };
            match result {
                Ok((path, name)) => {
                    let name = disambiguate(&name, &mut taken);
                    members.push(ArchiveMember { path, name });
                }
                Err(e) => log::warn!("Skipping {} in playlist batch: {}", id, e),
            }
        }

        log::info!("Playlist batch: {} of {} items fetched", members.len(), ids.len());
        if members.is_empty() {
            return Err(AppError::not_found("None of the selected videos could be downloaded"));
        }

        let zip_path = scratch.path().join(BATCH_ARCHIVE);
        build_zip(members, zip_path.clone()).await?;
        Artifact::from_file(&zip_path, scratch, action.archive_name().to_string(), ZIP_MIME).await
    }

    async fn batch_video(&self, video_id: &str, dir: &Path, context: &str) -> AppResult<(PathBuf, String)> {
        let info = self.video_info(video_id, context).await?;
        let formats = deliverable_formats(&info, Container::Mp4);
        let format = select_format(&formats, &Resolution::Highest)
            .ok_or_else(|| AppError::not_found("No stream found for this resolution"))?;
        let (path, stem) = self.fetch_video_file(video_id, &info, &format.format_id, dir, context).await?;
        Ok((path, format!("{}.{}", stem, Container::Mp4.extension())))
    }

    async fn batch_thumbnail(&self, video_id: &str, dir: &Path, context: &str) -> AppResult<(PathBuf, String)> {
        let info = self.video_info(video_id, context).await?;
        let (bytes, filename) = self.fetch_thumbnail(&info, context).await?;
        let path = dir.join(THUMBNAIL_FILE);
        tokio::fs::write(&path, &bytes).await?;
        Ok((path, filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yt_dlp_interface::stub::StubExtractor;
    use axum::{Router, extract::Path as AxumPath, http::StatusCode, response::IntoResponse, routing::get};
    use std::io::{Cursor, Read};
    use tempfile::TempDir;
    use tokio::net::TcpListener;
    use zip::ZipArchive;

    async fn thumbnail_server() -> String {
        async fn thumb(AxumPath(name): AxumPath<String>) -> axum::response::Response {
            if name.starts_with("missing") {
                (StatusCode::NOT_FOUND, "gone").into_response()
            } else {
                format!("jpeg:{}", name).into_response()
            }
        }
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let app = Router::new().route("/thumb/{name}", get(thumb));
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        format!("http://127.0.0.1:{}", port)
    }

    fn stub(base: &str) -> StubExtractor {
        StubExtractor::new()
            .with_video(
                "vid1",
                "My: Clip?",
                Some(&format!("{}/thumb/vid1.jpg", base)),
                &[("18", 360, true, "mp4"), ("22", 720, true, "mp4"), ("137", 1080, false, "mp4")],
            )
            .with_video("vid2", "Second", Some(&format!("{}/thumb/vid2.jpg", base)), &[("18", 360, true, "mp4")])
            .with_video("dup", "Second", None, &[("18", 360, true, "mp4")])
            .with_video("nothumb", "No Thumb", None, &[("18", 360, true, "mp4")])
            .with_video("deadthumb", "Dead", Some(&format!("{}/thumb/missing.jpg", base)), &[("18", 360, true, "mp4")])
            .with_video("broken", "Broken", None, &[("18", 360, true, "mp4")])
            .with_broken_download("broken")
            .with_video("webmonly", "Webm Only", None, &[("43", 720, true, "webm"), ("137", 1080, false, "mp4")])
            .with_video(
                "cjk",
                &long_title(),
                Some(&format!("{}/thumb/cjk.jpg", base)),
                &[("18", 360, true, "mp4")],
            )
    }

    /// 100 CJK characters: a legal YouTube title, 300 bytes of UTF-8.
    fn long_title() -> String {
        "日".repeat(100)
    }

    struct Fixture {
        orchestrator: Orchestrator,
        root: TempDir,
    }

    impl Fixture {
        async fn new() -> Self {
            let base = thumbnail_server().await;
            let root = TempDir::new().unwrap();
            let orchestrator = Orchestrator::new(
                Arc::new(stub(&base)),
                reqwest::Client::new(),
                root.path().to_path_buf(),
            );
            Fixture { orchestrator, root }
        }

        fn scratch_is_empty(&self) -> bool {
            std::fs::read_dir(self.root.path()).unwrap().count() == 0
        }
    }

    fn zip_names(bytes: Vec<u8>) -> Vec<String> {
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_download_video_highest() {
        let fx = Fixture::new().await;
        let artifact = fx.orchestrator.download_video("vid1", &Resolution::Highest).await.unwrap();
        assert_eq!(artifact.filename, "My- Clip-.mp4");
        assert_eq!(artifact.content_type, "video/mp4");
        assert!(!fx.scratch_is_empty());

        let body = artifact.into_bytes().await.unwrap();
        assert_eq!(String::from_utf8(body).unwrap(), "vid1|22");
        assert!(fx.scratch_is_empty());
    }

    #[tokio::test]
    async fn test_download_video_specific_resolution() {
        let fx = Fixture::new().await;
        let artifact = fx
            .orchestrator
            .download_video("vid1", &Resolution::Label("360p".into()))
            .await
            .unwrap();
        assert_eq!(String::from_utf8(artifact.into_bytes().await.unwrap()).unwrap(), "vid1|18");
        assert!(fx.scratch_is_empty());
    }

    #[tokio::test]
    async fn test_missing_resolution_is_not_found() {
        let fx = Fixture::new().await;
        // 1080p exists only as a video-only stream
        let result = fx.orchestrator.download_video("vid1", &Resolution::Label("1080p".into())).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(fx.scratch_is_empty());
    }

    #[tokio::test]
    async fn test_failures_leave_no_scratch() {
        let fx = Fixture::new().await;
        let result = fx.orchestrator.download_video("broken", &Resolution::Highest).await;
        assert!(matches!(result, Err(AppError::Extractor { .. })));
        let result = fx.orchestrator.download_video("unknown", &Resolution::Highest).await;
        assert!(matches!(result, Err(AppError::Extractor { .. })));
        let result = fx.orchestrator.download_video("../x", &Resolution::Highest).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert!(fx.scratch_is_empty());
    }

    #[tokio::test]
    async fn test_download_thumbnail() {
        let fx = Fixture::new().await;
        let artifact = fx.orchestrator.download_thumbnail("vid1").await.unwrap();
        assert_eq!(artifact.filename, "My- Clip-_thumbnail.jpg");
        assert_eq!(artifact.content_type, "image/jpeg");
        assert_eq!(artifact.into_bytes().await.unwrap(), b"jpeg:vid1.jpg".to_vec());

        assert!(matches!(fx.orchestrator.download_thumbnail("nothumb").await, Err(AppError::NotFound(_))));
        assert!(matches!(
            fx.orchestrator.download_thumbnail("deadthumb").await,
            Err(AppError::Extractor { .. })
        ));
        assert!(fx.scratch_is_empty());
    }

    #[tokio::test]
    async fn test_batch_skips_failures() {
        let fx = Fixture::new().await;
        let ids: Vec<String> = ["vid1", "broken", "vid2", "unknown", "vid1"].iter().map(|s| s.to_string()).collect();
        let artifact = fx.orchestrator.download_playlist_batch(&ids, BatchAction::Videos).await.unwrap();
        assert_eq!(artifact.filename, "playlist_videos.zip");
        assert_eq!(artifact.content_type, "application/zip");

        let names = zip_names(artifact.into_bytes().await.unwrap());
        assert_eq!(names, vec!["My- Clip-.mp4", "Second.mp4"]);
        assert!(fx.scratch_is_empty());
    }

    #[tokio::test]
    async fn test_batch_duplicate_titles_are_disambiguated() {
        let fx = Fixture::new().await;
        let ids = vec!["vid2".to_string(), "dup".to_string()];
        let artifact = fx.orchestrator.download_playlist_batch(&ids, BatchAction::Videos).await.unwrap();
        let bytes = artifact.into_bytes().await.unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut content = String::new();
        archive.by_name("Second (2).mp4").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "dup|18");
    }

    #[tokio::test]
    async fn test_batch_with_no_successes_is_not_found() {
        let fx = Fixture::new().await;
        let ids = vec!["broken".to_string(), "unknown".to_string()];
        let result = fx.orchestrator.download_playlist_batch(&ids, BatchAction::Videos).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(fx.scratch_is_empty());
    }

    #[tokio::test]
    async fn test_batch_thumbnails() {
        let fx = Fixture::new().await;
        let ids: Vec<String> = ["vid1", "nothumb", "vid2"].iter().map(|s| s.to_string()).collect();
        let artifact = fx.orchestrator.download_playlist_batch(&ids, BatchAction::Thumbnails).await.unwrap();
        assert_eq!(artifact.filename, "playlist_thumbnails.zip");
        let names = zip_names(artifact.into_bytes().await.unwrap());
        assert_eq!(names, vec!["My- Clip-_thumbnail.jpg", "Second_thumbnail.jpg"]);
        assert!(fx.scratch_is_empty());
    }

    #[tokio::test]
    async fn test_long_multibyte_title_downloads() {
        let fx = Fixture::new().await;
        let expected = format!("{}.mp4", long_title());
        assert!(expected.len() > 255);

        let artifact = fx.orchestrator.download_video("cjk", &Resolution::Highest).await.unwrap();
        assert_eq!(artifact.filename, expected);
        assert_eq!(artifact.into_bytes().await.unwrap(), b"cjk|18".to_vec());
        assert!(fx.scratch_is_empty());

        let ids = vec!["cjk".to_string(), "vid2".to_string()];
        let artifact = fx.orchestrator.download_playlist_batch(&ids, BatchAction::Videos).await.unwrap();
        let bytes = artifact.into_bytes().await.unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut content = String::new();
        archive.by_name(&expected).unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "cjk|18");
        assert_eq!(archive.len(), 2);

        let artifact = fx.orchestrator.download_playlist_batch(&ids[..1], BatchAction::Thumbnails).await.unwrap();
        let names = zip_names(artifact.into_bytes().await.unwrap());
        assert_eq!(names, vec![format!("{}_thumbnail.jpg", long_title())]);
        assert!(fx.scratch_is_empty());
    }

    #[tokio::test]
    async fn test_batch_skips_items_without_mp4_stream() {
        let fx = Fixture::new().await;
        let ids = vec!["webmonly".to_string(), "vid2".to_string()];
        let artifact = fx.orchestrator.download_playlist_batch(&ids, BatchAction::Videos).await.unwrap();
        assert_eq!(zip_names(artifact.into_bytes().await.unwrap()), vec!["Second.mp4"]);

        let result = fx.orchestrator.download_playlist_batch(&ids[..1], BatchAction::Videos).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(fx.scratch_is_empty());
    }

    #[test]
    fn test_batch_action_parse() {
        assert_eq!(BatchAction::parse(None).unwrap(), BatchAction::Videos);
        assert_eq!(BatchAction::parse(Some("videos")).unwrap(), BatchAction::Videos);
        assert_eq!(BatchAction::parse(Some("all_videos_zip")).unwrap(), BatchAction::Videos);
        assert_eq!(BatchAction::parse(Some("thumbnails")).unwrap(), BatchAction::Thumbnails);
        assert!(BatchAction::parse(Some("everything")).is_err());
    }
}
