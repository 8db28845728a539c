use std::path::Path;
use tokio::fs;
use anyhow::Result;

use crate::yt_dlp_interface::utils::is_executable_present;
use crate::yt_dlp_interface::urls::get_latest_yt_dlp_url;
use crate::yt_dlp_interface::downloader::download_file;

/// `true` when the path names a program to be looked up on `PATH`
/// rather than a file we manage.
pub fn is_bare_program(path: &Path) -> bool {
    path.components().count() == 1 && !path.is_absolute()
}

/// Makes sure the yt-dlp binary exists, downloading the latest release into
/// place when it is missing and `auto_install` allows it.
pub async fn ensure_yt_dlp(client: &reqwest::Client, yt_dlp_path: &Path, auto_install: bool) -> Result<()> {
    if is_bare_program(yt_dlp_path) {
        log::info!("Using {:?} from PATH", yt_dlp_path);
        return Ok(());
    }

    if is_executable_present(yt_dlp_path) {
        log::info!("yt-dlp already exists at {:?}", yt_dlp_path);
        return Ok(());
    }

    if !auto_install {
        return Err(anyhow::anyhow!("yt-dlp not found at {:?} and auto-install is disabled", yt_dlp_path));
    }

    log::info!("yt-dlp not found, downloading latest version...");
    if let Some(parent) = yt_dlp_path.parent() {
        fs::create_dir_all(parent).await?;
    }
    download_file(client, &get_latest_yt_dlp_url(), yt_dlp_path).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(yt_dlp_path).await?.permissions();
        perms.set_mode(0o755);  // Make executable
        fs::set_permissions(yt_dlp_path, perms).await?;
    }

    if !is_executable_present(yt_dlp_path) {
        return Err(anyhow::anyhow!("yt-dlp not available at {:?} after download", yt_dlp_path));
    }
    Ok(())
}
