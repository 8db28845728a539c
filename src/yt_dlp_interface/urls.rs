const RELEASES_URL: &str = "https://github.com/yt-dlp/yt-dlp/releases/latest/download";

/// File name of the binary we keep in the libraries directory.
pub fn yt_dlp_binary_name() -> &'static str {
    if cfg!(target_os = "windows") { "yt-dlp.exe" } else { "yt-dlp" }
}

/// Name of the standalone release asset for this platform.
fn release_asset() -> &'static str {
    if cfg!(target_os = "windows") {
        "yt-dlp.exe"
    } else if cfg!(target_os = "linux") {
        "yt-dlp_linux"
    } else if cfg!(target_os = "macos") {
        "yt-dlp_macos"
    } else {
        "yt-dlp" // zipimport build, needs python
    }
}

pub fn get_latest_yt_dlp_url() -> String {
    format!("{}/{}", RELEASES_URL, release_asset())
}
