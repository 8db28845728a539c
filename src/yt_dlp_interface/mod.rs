pub mod extractor;
pub mod fetcher;
pub mod models;
pub mod options;
pub mod utils;
pub mod urls;
pub mod downloader;
pub mod ensure;
#[cfg(test)]
pub mod stub;

pub use extractor::Extractor;
pub use fetcher::YoutubeFetcher;
pub use models::{FormatDescriptor, PlaylistEntry, VideoInfo};
pub use options::{Container, DownloadOptions};
pub use ensure::ensure_yt_dlp;
pub use downloader::fetch_bytes;
